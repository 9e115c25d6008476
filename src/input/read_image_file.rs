// 该文件是 Shouyu （手语） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RawFrame, input::FrameSource};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 静态图片输入
///
/// 默认只产出一帧；URL 带 `loop` 参数时每次都返回同一张图片，用于模拟静止的摄像头。
pub struct ImageFileInput {
  image: Option<RgbImage>,
  repeat: bool,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url.path();
    let image = ImageReader::open(path)?.decode()?.to_rgb8();
    let repeat = url.query_pairs().any(|(k, _)| k == "loop");
    info!(
      "读取图片: {} ({}x{}), 循环: {}",
      path,
      image.width(),
      image.height(),
      repeat
    );

    Ok(Self::from_image(image, repeat))
  }
}

impl ImageFileInput {
  pub fn from_image(image: RgbImage, repeat: bool) -> Self {
    Self {
      image: Some(image),
      repeat,
    }
  }
}

impl FrameSource for ImageFileInput {
  fn next_frame(&mut self) -> Option<RawFrame> {
    let image = if self.repeat {
      self.image.clone()
    } else {
      self.image.take()
    };
    image.map(RawFrame::from_rgb_image)
  }

  fn is_finished(&self) -> bool {
    self.image.is_none()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn single_shot_finishes_after_one_frame() {
    let mut input = ImageFileInput::from_image(RgbImage::from_pixel(4, 3, Rgb([1, 2, 3])), false);
    assert!(!input.is_finished());
    let frame = input.next_frame().unwrap();
    assert_eq!((frame.width(), frame.height()), (4, 3));
    assert!(input.is_finished());
    assert!(input.next_frame().is_none());
  }

  #[test]
  fn looping_input_never_finishes() {
    let mut input = ImageFileInput::from_image(RgbImage::new(2, 2), true);
    for _ in 0..3 {
      assert!(input.next_frame().is_some());
    }
    assert!(!input.is_finished());
  }

  #[test]
  fn loads_from_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("still.png");
    RgbImage::from_pixel(5, 4, Rgb([9, 8, 7])).save(&path).unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let mut input = ImageFileInput::from_url(&url).unwrap();
    let frame = input.next_frame().unwrap();
    assert_eq!((frame.width(), frame.height()), (5, 4));
    assert_eq!(&frame.as_bytes()[..3], &[9, 8, 7]);
  }

  #[test]
  fn missing_file_is_an_error() {
    let url = Url::parse("image:///definitely/not/here.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::IoError(_))
    ));
  }
}
