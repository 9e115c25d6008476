// 该文件是 Shouyu （手语） 项目的一部分。
// src/frame.rs - 原始帧定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{ImageBuffer, Rgb, RgbImage};
use thiserror::Error;

const CHANNELS: usize = 3;

/// 像素通道顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
  /// 摄像头原生顺序
  Bgr,
  Rgb,
}

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 输入源产生的原始帧，HWC 排列，每像素 3 字节
#[derive(Debug, Clone)]
pub struct RawFrame {
  width: u32,
  height: u32,
  order: ChannelOrder,
  data: Box<[u8]>,
}

impl RawFrame {
  pub fn new(
    width: u32,
    height: u32,
    order: ChannelOrder,
    data: Vec<u8>,
  ) -> Result<Self, FrameError> {
    let expected = CHANNELS * width as usize * height as usize;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      width,
      height,
      order,
      data: data.into_boxed_slice(),
    })
  }

  pub fn from_rgb_image(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      width,
      height,
      order: ChannelOrder::Rgb,
      data: image.into_raw().into_boxed_slice(),
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn channel_order(&self) -> ChannelOrder {
    self.order
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.data
  }

  /// 转换为 RGB 并水平镜像，使画面中的左右手与用户直觉一致
  pub fn to_mirrored_rgb(&self) -> RgbImage {
    let width = self.width as usize;
    let (r, b) = match self.order {
      ChannelOrder::Rgb => (0, 2),
      ChannelOrder::Bgr => (2, 0),
    };

    ImageBuffer::from_fn(self.width, self.height, |x, y| {
      let src_x = width - 1 - x as usize;
      let idx = (y as usize * width + src_x) * CHANNELS;
      Rgb([self.data[idx + r], self.data[idx + 1], self.data[idx + b]])
    })
  }
}
