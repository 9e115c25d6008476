// 该文件是 Shouyu （手语） 项目的一部分。
// src/input.rs - 视频/图像输入
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

use thiserror::Error;

use crate::{FromUrl, frame::RawFrame};

/// 帧来源
///
/// 每次调用 [`FrameSource::next_frame`] 拉取一帧。返回 `None` 表示本周期没有可用帧
/// （读取失败、摄像头尚未就绪等），调用方应跳过本周期并在下个周期重试，而不是结束。
pub trait FrameSource {
  fn next_frame(&mut self) -> Option<RawFrame>;

  /// 有限输入源（图片文件）读完后返回 `true`，摄像头永远不会结束
  fn is_finished(&self) -> bool {
    false
  }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
  fn next_frame(&mut self) -> Option<RawFrame> {
    (**self).next_frame()
  }

  fn is_finished(&self) -> bool {
    (**self).is_finished()
  }
}

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(feature = "v4l_input")]
mod v4l_input;
#[cfg(feature = "v4l_input")]
pub use self::v4l_input::{V4lInput, V4lInputError};

#[cfg(feature = "gstreamer_input")]
mod gstreamer_input;
#[cfg(feature = "gstreamer_input")]
pub use self::gstreamer_input::{
  GStreamerInput, GStreamerInputError, GStreamerInputPipelineBuilder,
};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "v4l_input")]
  #[error("V4L input error: {0}")]
  V4lInputError(#[from] V4lInputError),
  #[cfg(feature = "gstreamer_input")]
  #[error("GStreamer input error: {0}")]
  GStreamerInputError(#[from] GStreamerInputError),
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
  #[cfg(feature = "v4l_input")]
  V4l(V4lInput),
  #[cfg(feature = "gstreamer_input")]
  GStreamerInput(GStreamerInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
    }
    #[cfg(feature = "v4l_input")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == V4lInput::SCHEME {
        let input = V4lInput::from_url(url)?;
        return Ok(InputWrapper::V4l(input));
      }
    }
    #[cfg(feature = "gstreamer_input")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == GStreamerInputPipelineBuilder::SCHEME {
        let input = GStreamerInputPipelineBuilder::from_url(url)?.build()?;
        return Ok(InputWrapper::GStreamerInput(input));
      }
    }
    Err(InputError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl FrameSource for InputWrapper {
  fn next_frame(&mut self) -> Option<RawFrame> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.next_frame(),
      #[cfg(feature = "v4l_input")]
      InputWrapper::V4l(input) => input.next_frame(),
      #[cfg(feature = "gstreamer_input")]
      InputWrapper::GStreamerInput(input) => input.next_frame(),
      #[allow(unreachable_patterns)]
      _ => None,
    }
  }

  fn is_finished(&self) -> bool {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.is_finished(),
      #[cfg(feature = "v4l_input")]
      InputWrapper::V4l(input) => input.is_finished(),
      #[cfg(feature = "gstreamer_input")]
      InputWrapper::GStreamerInput(input) => input.is_finished(),
      #[allow(unreachable_patterns)]
      _ => true,
    }
  }
}
