// 该文件是 Shouyu （手语） 项目的一部分。
// src/input/v4l_input.rs - V4L 摄像头输入
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

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;
use v4l::{
  Device, FourCC, buffer::Type, io::mmap::Stream, io::traits::CaptureStream, video::Capture,
};

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{ChannelOrder, RawFrame},
  input::FrameSource,
};

#[derive(Error, Debug)]
pub enum V4lInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("无法打开摄像头 {path}: {source}")]
  OpenDevice {
    path: String,
    source: std::io::Error,
  },
  #[error("V4L error: {0}")]
  V4lError(#[from] std::io::Error),
  #[error("Unsupported pixel format: {0}")]
  UnsupportedPixelFormat(String),
}

const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const BUFFER_COUNT: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelFormat {
  Yuyv,
  Mjpg,
  Rgb3,
  Bgr3,
}

impl PixelFormat {
  fn from_fourcc(fourcc: FourCC) -> Option<Self> {
    match &fourcc.repr {
      b"YUYV" => Some(PixelFormat::Yuyv),
      b"MJPG" => Some(PixelFormat::Mjpg),
      b"RGB3" => Some(PixelFormat::Rgb3),
      b"BGR3" => Some(PixelFormat::Bgr3),
      _ => None,
    }
  }

  fn fourcc(self) -> FourCC {
    match self {
      PixelFormat::Yuyv => FourCC::new(b"YUYV"),
      PixelFormat::Mjpg => FourCC::new(b"MJPG"),
      PixelFormat::Rgb3 => FourCC::new(b"RGB3"),
      PixelFormat::Bgr3 => FourCC::new(b"BGR3"),
    }
  }
}

/// V4L2 摄像头
///
/// 设备在构造时打开并一直持有，`Drop` 时随流一起释放。
/// URL 形如 `v4l:///dev/video0?width=640&height=480&format=YUYV`。
pub struct V4lInput {
  // 字段顺序保证流先于设备释放
  stream: Stream<'static>,
  _device: Device,
  width: u32,
  height: u32,
  format: PixelFormat,
}

impl FromUrlWithScheme for V4lInput {
  const SCHEME: &'static str = "v4l";
}

impl FromUrl for V4lInput {
  type Error = V4lInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(V4lInputError::SchemaMismatch);
    }

    let device_path = if url.path().is_empty() || url.path() == "/" {
      DEFAULT_DEVICE.to_string()
    } else {
      url.path().to_string()
    };

    let query: HashMap<String, String> = url
      .query_pairs()
      .map(|(k, v)| (String::from(k), String::from(v)))
      .collect();
    let width = query
      .get("width")
      .and_then(|v| v.parse::<u32>().ok())
      .unwrap_or(DEFAULT_WIDTH);
    let height = query
      .get("height")
      .and_then(|v| v.parse::<u32>().ok())
      .unwrap_or(DEFAULT_HEIGHT);
    let format = match query.get("format") {
      Some(name) => {
        let bytes: [u8; 4] = name
          .as_bytes()
          .try_into()
          .map_err(|_| V4lInputError::UnsupportedPixelFormat(name.clone()))?;
        PixelFormat::from_fourcc(FourCC::new(&bytes))
          .ok_or_else(|| V4lInputError::UnsupportedPixelFormat(name.clone()))?
      }
      None => PixelFormat::Yuyv,
    };

    Self::open(&device_path, width, height, format)
  }
}

impl V4lInput {
  fn open(
    device_path: &str,
    width: u32,
    height: u32,
    format: PixelFormat,
  ) -> Result<Self, V4lInputError> {
    info!("打开摄像头: {}", device_path);
    let device = Device::with_path(device_path).map_err(|source| V4lInputError::OpenDevice {
      path: device_path.to_string(),
      source,
    })?;

    let mut requested = device.format()?;
    requested.width = width;
    requested.height = height;
    requested.fourcc = format.fourcc();
    let actual = device.set_format(&requested)?;

    // 驱动可能协商出别的格式，以实际结果为准
    let format = PixelFormat::from_fourcc(actual.fourcc)
      .ok_or_else(|| V4lInputError::UnsupportedPixelFormat(actual.fourcc.to_string()))?;
    info!(
      "摄像头格式: {}x{} {}",
      actual.width, actual.height, actual.fourcc
    );

    let stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)?;

    Ok(V4lInput {
      stream,
      _device: device,
      width: actual.width,
      height: actual.height,
      format,
    })
  }

  fn decode(&self, buf: &[u8]) -> Option<RawFrame> {
    let (width, height) = (self.width, self.height);
    let pixels = width as usize * height as usize;
    let frame = match self.format {
      PixelFormat::Yuyv => {
        if buf.len() < pixels * 2 {
          warn!("YUYV 缓冲区过小: {} < {}", buf.len(), pixels * 2);
          return None;
        }
        RawFrame::new(width, height, ChannelOrder::Bgr, yuyv_to_bgr(&buf[..pixels * 2]))
      }
      PixelFormat::Mjpg => {
        let image = image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg)
          .map_err(|e| warn!("MJPG 解码失败: {}", e))
          .ok()?
          .to_rgb8();
        Ok(RawFrame::from_rgb_image(image))
      }
      PixelFormat::Rgb3 | PixelFormat::Bgr3 => {
        let order = if self.format == PixelFormat::Rgb3 {
          ChannelOrder::Rgb
        } else {
          ChannelOrder::Bgr
        };
        let size = pixels * 3;
        if buf.len() < size {
          warn!("缓冲区大小不匹配: {} < {}", buf.len(), size);
          return None;
        }
        RawFrame::new(width, height, order, buf[..size].to_vec())
      }
    };

    frame.map_err(|e| warn!("帧构造失败: {}", e)).ok()
  }
}

impl FrameSource for V4lInput {
  fn next_frame(&mut self) -> Option<RawFrame> {
    let buf = match self.stream.next() {
      Ok((buf, meta)) => {
        debug!("采集到帧 #{}, {} 字节", meta.sequence, meta.bytesused);
        buf.to_vec()
      }
      Err(e) => {
        warn!("Failed to capture frame: {}", e);
        return None;
      }
    };
    self.decode(&buf)
  }
}

fn clamp_u8(value: i32) -> u8 {
  value.clamp(0, 255) as u8
}

/// YUYV 4:2:2 转 BGR24，BT.601 整数近似
fn yuyv_to_bgr(data: &[u8]) -> Vec<u8> {
  let mut out = Vec::with_capacity(data.len() / 2 * 3);
  for chunk in data.chunks_exact(4) {
    let (y0, u, y1, v) = (
      chunk[0] as i32,
      chunk[1] as i32 - 128,
      chunk[2] as i32,
      chunk[3] as i32 - 128,
    );
    for y in [y0, y1] {
      let c = y - 16;
      let r = (298 * c + 409 * v + 128) >> 8;
      let g = (298 * c - 100 * u - 208 * v + 128) >> 8;
      let b = (298 * c + 516 * u + 128) >> 8;
      out.extend_from_slice(&[clamp_u8(b), clamp_u8(g), clamp_u8(r)]);
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn yuyv_grey_stays_grey() {
    // Y=128, U=V=128 为中性灰
    let bgr = yuyv_to_bgr(&[128, 128, 128, 128]);
    assert_eq!(bgr.len(), 6);
    assert!(bgr.iter().all(|&c| c == bgr[0]));
  }

  #[test]
  fn yuyv_black_and_white_clamp() {
    let bgr = yuyv_to_bgr(&[0, 128, 255, 128]);
    assert_eq!(&bgr[..3], &[0, 0, 0]);
    assert_eq!(&bgr[3..], &[255, 255, 255]);
  }

  #[test]
  fn fourcc_mapping() {
    assert_eq!(
      PixelFormat::from_fourcc(FourCC::new(b"MJPG")),
      Some(PixelFormat::Mjpg)
    );
    assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"NV12")), None);
  }
}
