// 该文件是 Shouyu （手语） 项目的一部分。
// src/output/mjpeg_stream.rs - MJPEG 流输出
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

//! # MJPEG 流输出
//!
//! 每帧编码为 JPEG，按 `multipart/x-mixed-replace` 分段：
//!
//! ```text
//! --frame\r\n
//! Content-Type: image/jpeg\r\n
//! \r\n
//! <jpeg>\r\n
//! ```
//!
//! [`MjpegStream`] 实现 [`Read`]，读取时才向输入源拉帧，可以直接作为 HTTP 响应体。

use std::{
  collections::VecDeque,
  io::{self, Read},
  thread,
  time::Duration,
};

use image::{RgbImage, codecs::jpeg::JpegEncoder};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  input::FrameSource,
  model::{Classifier, LandmarkDetector},
  output::{Render, draw::LabelDraw},
  pipeline::{Recognition, RecognitionPipeline},
};

pub const BOUNDARY: &str = "frame";
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

const DEFAULT_QUALITY: u8 = 80;
const DEFAULT_TICK: Duration = Duration::from_millis(20);

#[derive(Error, Debug)]
pub enum StreamError {
  #[error("JPEG 编码错误: {0}")]
  EncodeError(#[from] image::ImageError),
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, StreamError> {
  let mut jpeg = Vec::new();
  let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
  encoder.encode_image(image)?;
  Ok(jpeg)
}

pub fn multipart_part(jpeg: &[u8]) -> Vec<u8> {
  let header = format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", BOUNDARY);
  let mut part = Vec::with_capacity(header.len() + jpeg.len() + 2);
  part.extend_from_slice(header.as_bytes());
  part.extend_from_slice(jpeg);
  part.extend_from_slice(b"\r\n");
  part
}

/// 流输出：把标签烧进画面后编码为 multipart 分段
pub struct StreamOutput {
  label: Option<LabelDraw>,
  quality: u8,
  parts: VecDeque<Vec<u8>>,
}

impl Default for StreamOutput {
  fn default() -> Self {
    Self::new()
  }
}

impl StreamOutput {
  pub fn new() -> Self {
    Self {
      label: None,
      quality: DEFAULT_QUALITY,
      parts: VecDeque::new(),
    }
  }

  /// 没有字体时只输出骨架与边框
  pub fn with_label(mut self, label: LabelDraw) -> Self {
    self.label = Some(label);
    self
  }

  pub fn with_quality(mut self, quality: u8) -> Self {
    self.quality = quality;
    self
  }

  pub fn take_part(&mut self) -> Option<Vec<u8>> {
    self.parts.pop_front()
  }
}

impl Render for StreamOutput {
  type Error = StreamError;

  fn render_result(&mut self, result: Recognition) -> Result<(), Self::Error> {
    let Recognition {
      mut image,
      label,
      bbox,
      palette,
      ..
    } = result;

    if let (Some(draw), Some(bbox)) = (&self.label, bbox) {
      draw.draw_label(&mut image, bbox, label.glyph(), &palette);
    }

    let jpeg = encode_jpeg(&image, self.quality)?;
    debug!("JPEG 帧大小: {:.2} KB", jpeg.len() as f64 / 1024.0);
    self.parts.push_back(multipart_part(&jpeg));
    Ok(())
  }
}

/// 按需拉帧的 MJPEG 字节流
///
/// 输入源暂时没有帧时等待一个周期后重试；有限输入源读完后返回 EOF。
pub struct MjpegStream<S, D, C> {
  source: S,
  pipeline: RecognitionPipeline<D, C>,
  output: StreamOutput,
  pending: Vec<u8>,
  offset: usize,
  tick: Duration,
  frames: usize,
}

impl<S: FrameSource, D: LandmarkDetector, C: Classifier> MjpegStream<S, D, C> {
  pub fn new(source: S, pipeline: RecognitionPipeline<D, C>, output: StreamOutput) -> Self {
    Self {
      source,
      pipeline,
      output,
      pending: Vec::new(),
      offset: 0,
      tick: DEFAULT_TICK,
      frames: 0,
    }
  }

  pub fn with_tick(mut self, tick: Duration) -> Self {
    self.tick = tick;
    self
  }

  pub fn frames(&self) -> usize {
    self.frames
  }

  fn fill(&mut self) -> io::Result<bool> {
    loop {
      if let Some(part) = self.output.take_part() {
        self.pending = part;
        self.offset = 0;
        return Ok(true);
      }
      if self.source.is_finished() {
        info!("输入源结束，共输出 {} 帧", self.frames);
        return Ok(false);
      }
      match self.source.next_frame() {
        Some(frame) => {
          let result = self.pipeline.process(&frame);
          self.output.render_result(result).map_err(io::Error::other)?;
          self.frames += 1;
        }
        None => thread::sleep(self.tick),
      }
    }
  }
}

impl<S: FrameSource, D: LandmarkDetector, C: Classifier> Read for MjpegStream<S, D, C> {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    if buf.is_empty() {
      return Ok(0);
    }
    if self.offset >= self.pending.len() && !self.fill()? {
      return Ok(0);
    }
    let n = buf.len().min(self.pending.len() - self.offset);
    buf[..n].copy_from_slice(&self.pending[self.offset..self.offset + n]);
    self.offset += n;
    Ok(n)
  }
}

#[cfg(test)]
mod tests {
  use image::Rgb;

  use super::*;
  use crate::{
    frame::RawFrame,
    model::{LandmarkPoint, RawHand},
  };

  struct NoHands;

  impl LandmarkDetector for NoHands {
    type Error = std::convert::Infallible;

    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<RawHand>, Self::Error> {
      Ok(Vec::new())
    }
  }

  struct OneHand;

  impl LandmarkDetector for OneHand {
    type Error = std::convert::Infallible;

    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<RawHand>, Self::Error> {
      Ok(vec![vec![LandmarkPoint::new(0.5, 0.5); 21]])
    }
  }

  struct AlwaysA;

  impl Classifier for AlwaysA {
    type Error = std::convert::Infallible;

    fn input_width(&self) -> usize {
      42
    }

    fn predict(&self, _features: &[f32]) -> Result<usize, Self::Error> {
      Ok(0)
    }
  }

  /// 依次给出若干帧，中间夹杂一次无帧
  struct Frames(Vec<Option<RawFrame>>);

  impl FrameSource for Frames {
    fn next_frame(&mut self) -> Option<RawFrame> {
      if self.0.is_empty() {
        None
      } else {
        self.0.remove(0)
      }
    }

    fn is_finished(&self) -> bool {
      self.0.is_empty()
    }
  }

  fn frame() -> RawFrame {
    RawFrame::from_rgb_image(RgbImage::from_pixel(32, 24, Rgb([10, 20, 30])))
  }

  fn split_parts(bytes: &[u8]) -> usize {
    let marker = format!("--{}\r\n", BOUNDARY);
    bytes
      .windows(marker.len())
      .filter(|w| *w == marker.as_bytes())
      .count()
  }

  #[test]
  fn part_framing() {
    let part = multipart_part(&[0xff, 0xd8, 0xff, 0xd9]);
    assert!(part.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
    assert!(part.ends_with(&[0xff, 0xd9, b'\r', b'\n']));
    assert_eq!(CONTENT_TYPE, format!("multipart/x-mixed-replace; boundary={}", BOUNDARY));
  }

  #[test]
  fn encodes_decodable_jpeg() {
    let image = RgbImage::from_pixel(16, 8, Rgb([200, 100, 50]));
    let jpeg = encode_jpeg(&image, 80).unwrap();
    assert_eq!(&jpeg[..2], &[0xff, 0xd8]);
    let decoded = image::load_from_memory(&jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (16, 8));
  }

  #[test]
  fn stream_ends_when_source_finishes() {
    let source = Frames(vec![Some(frame()), None, Some(frame())]);
    let pipeline = RecognitionPipeline::builder(NoHands, AlwaysA).build();
    let mut stream =
      MjpegStream::new(source, pipeline, StreamOutput::new()).with_tick(Duration::from_millis(1));

    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes).unwrap();
    assert_eq!(stream.frames(), 2);
    assert_eq!(split_parts(&bytes), 2);
  }

  #[test]
  fn label_is_burned_above_box() {
    let render = |output: &mut StreamOutput| {
      let source = RawFrame::from_rgb_image(RgbImage::from_pixel(200, 150, Rgb([10, 20, 30])));
      let mut pipeline = RecognitionPipeline::builder(OneHand, AlwaysA).build();
      let result = pipeline.process(&source);
      // 关键点 (100, 75)，边框 (90, 65) - (110, 85)
      assert!(result.bbox.is_some());
      output.render_result(result).unwrap();
      let part = output.take_part().unwrap();
      let header = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".len();
      image::load_from_memory(&part[header..part.len() - 2])
        .unwrap()
        .to_rgb8()
    };

    let plain = render(&mut StreamOutput::new());
    let labeled = render(&mut StreamOutput::new().with_label(LabelDraw::embedded().unwrap()));

    let difference: u32 = (0..60)
      .flat_map(|y| (80..160).map(move |x| (x, y)))
      .map(|(x, y)| {
        let (a, b) = (plain.get_pixel(x, y), labeled.get_pixel(x, y));
        (0..3).map(|c| a[c].abs_diff(b[c]) as u32).sum::<u32>()
      })
      .sum();
    assert!(difference > 1000);
  }

  #[test]
  fn detected_frames_are_streamed_without_font() {
    let source = Frames(vec![Some(frame())]);
    let pipeline = RecognitionPipeline::builder(OneHand, AlwaysA).build();
    let mut stream = MjpegStream::new(source, pipeline, StreamOutput::new().with_quality(50));

    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes).unwrap();
    assert_eq!(split_parts(&bytes), 1);
  }
}
