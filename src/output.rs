// 该文件是 Shouyu （手语） 项目的一部分。
// src/output.rs - 输出定义
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

use image::RgbImage;
use thiserror::Error;
use url::Url;

use crate::{FromUrl, pipeline::Recognition};

/// 消费识别结果的输出
pub trait Render {
  type Error;
  fn render_result(&mut self, result: Recognition) -> Result<(), Self::Error>;
}

/// 只显示图像的画面输出（窗口、文件）
pub trait FrameView {
  type Error;
  fn show(&mut self, image: &RgbImage) -> Result<(), Self::Error>;
}

impl<V: FrameView + ?Sized> FrameView for Box<V> {
  type Error = V::Error;

  fn show(&mut self, image: &RgbImage) -> Result<(), Self::Error> {
    (**self).show(image)
  }
}

pub mod draw;
mod theme;
pub use self::theme::{Palette, ParseThemeError, Theme, ThemeSwitch};

mod desktop;
pub use self::desktop::{DesktopOutput, LabelIndicator, status_line};

#[cfg(feature = "http_stream")]
mod mjpeg_stream;
#[cfg(feature = "http_stream")]
pub use self::mjpeg_stream::{
  BOUNDARY, CONTENT_TYPE, MjpegStream, StreamError, StreamOutput, encode_jpeg, multipart_part,
};

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "gstreamer_output")]
mod gstreamer_display;
#[cfg(feature = "gstreamer_output")]
pub use self::gstreamer_display::{GStreamerDisplay, GStreamerDisplayError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[cfg(feature = "gstreamer_output")]
  #[error("GStreamer 显示错误: {0}")]
  GStreamerDisplayError(#[from] GStreamerDisplayError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OutputWrapper {
  #[cfg(feature = "save_image_file")]
  SaveImageFile(SaveImageFileOutput),
  #[cfg(feature = "gstreamer_output")]
  GStreamerDisplay(GStreamerDisplay),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "save_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == SaveImageFileOutput::SCHEME {
        let output = SaveImageFileOutput::from_url(url)?;
        return Ok(OutputWrapper::SaveImageFile(output));
      }
    }
    #[cfg(feature = "gstreamer_output")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == GStreamerDisplay::SCHEME {
        let output = GStreamerDisplay::from_url(url)?;
        return Ok(OutputWrapper::GStreamerDisplay(output));
      }
    }
    Err(OutputError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl FrameView for OutputWrapper {
  type Error = OutputError;

  fn show(&mut self, image: &RgbImage) -> Result<(), Self::Error> {
    match self {
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFile(output) => output.show(image).map_err(OutputError::from),
      #[cfg(feature = "gstreamer_output")]
      OutputWrapper::GStreamerDisplay(output) => output.show(image).map_err(OutputError::from),
      #[allow(unreachable_patterns)]
      _ => {
        let _ = image;
        Ok(())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = Url::parse("rtsp://camera.local/stream").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&url),
      Err(OutputError::SchemeMismatch(scheme)) if scheme == "rtsp"
    ));
  }
}
