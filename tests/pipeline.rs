// 该文件是 Shouyu （手语） 项目的一部分。
// tests/pipeline.rs - 识别流程集成测试
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

#![cfg(all(feature = "read_image_file", feature = "save_image_file"))]

use image::{Rgb, RgbImage};
use shouyu::{
  input::ImageFileInput,
  model::{
    HandLandmarks, KnnClassifier, LandmarkDetector, LandmarkPoint, RawHand, SignLabel, normalize,
  },
  output::{DesktopOutput, SaveImageFileOutput, Theme},
  pipeline::RecognitionPipeline,
  task::{ContinuousTask, OneShotTask, Task},
};

/// 每帧返回相同关键点的检测器
struct Scripted(Vec<RawHand>);

impl LandmarkDetector for Scripted {
  type Error = std::convert::Infallible;

  fn detect(&mut self, _image: &RgbImage) -> Result<Vec<RawHand>, Self::Error> {
    Ok(self.0.clone())
  }
}

// 张开的手：x ∈ [0.25, 0.5]，y ∈ [0.25, 0.75]
fn open_hand() -> RawHand {
  (0..21)
    .map(|i| LandmarkPoint::new(0.25 + (i % 5) as f32 * 0.0625, 0.25 + (i / 5) as f32 * 0.125))
    .collect()
}

// 握拳：所有点挤在一起
fn fist() -> RawHand {
  (0..21)
    .map(|i| LandmarkPoint::new(0.4 + (i % 3) as f32 * 0.01, 0.4 + (i % 4) as f32 * 0.01))
    .collect()
}

fn features_of(hand: &RawHand) -> Vec<f32> {
  let hand = HandLandmarks::from_raw(hand).unwrap();
  normalize(&[hand]).as_slice().to_vec()
}

/// 类别 0（A）为张开的手，类别 4（S）为握拳
fn trained_model() -> KnnClassifier {
  let model = serde_json::json!({
    "input_width": 42,
    "k": 1,
    "samples": [
      {"class": 0, "features": features_of(&open_hand())},
      {"class": 4, "features": features_of(&fist())},
    ]
  });
  KnnClassifier::from_json_str(&model.to_string()).unwrap()
}

fn camera_image() -> RgbImage {
  RgbImage::from_pixel(640, 480, Rgb([30, 30, 30]))
}

#[test]
fn one_shot_recognizes_letter_and_saves_annotated_image() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("annotated.png");

  let mut pipeline = RecognitionPipeline::builder(Scripted(vec![open_hand()]), trained_model())
    .theme(Theme::Dark)
    .build();
  let output = DesktopOutput::new(SaveImageFileOutput::new(&path));
  let indicator = output.indicator().clone();

  let label = OneShotTask
    .run_task(
      ImageFileInput::from_image(camera_image(), false),
      &mut pipeline,
      output,
    )
    .unwrap();
  assert_eq!(label, SignLabel::A);
  assert_eq!(indicator.text(), "A");

  let saved = image::open(&path).unwrap().to_rgb8();
  let frame = Theme::Dark.palette().frame;
  // 边框 (150, 110) - (330, 370)，左上角横向角标长 20 像素
  assert_eq!(*saved.get_pixel(150, 110), frame);
  assert_eq!(*saved.get_pixel(170, 109), frame);
  assert_eq!(*saved.get_pixel(171, 109), Rgb([30, 30, 30]));
  assert_eq!(*saved.get_pixel(330, 370), frame);
}

#[test]
fn translated_hand_gets_same_letter() {
  let shifted: RawHand = fist()
    .into_iter()
    .map(|p| LandmarkPoint::new(p.x + 0.3, p.y - 0.2))
    .collect();
  let mut pipeline = RecognitionPipeline::builder(Scripted(vec![shifted]), trained_model()).build();
  let result = pipeline.recognize(camera_image());
  assert_eq!(result.label, SignLabel::S);
}

#[test]
fn second_hand_makes_frame_unknown() {
  let mut pipeline =
    RecognitionPipeline::builder(Scripted(vec![open_hand(), fist()]), trained_model())
      .max_hands(2)
      .build();
  let result = pipeline.recognize(camera_image());
  assert_eq!(result.label, SignLabel::Unknown);
  assert!(result.bbox.is_none());

  // 默认只保留一只手
  let mut single =
    RecognitionPipeline::builder(Scripted(vec![open_hand(), fist()]), trained_model()).build();
  assert_eq!(single.recognize(camera_image()).label, SignLabel::A);
}

#[test]
fn continuous_task_drains_finite_source() {
  let dir = tempfile::tempdir().unwrap();
  let output = DesktopOutput::new(SaveImageFileOutput::new(dir.path().join("frame.png")));
  let mut pipeline = RecognitionPipeline::builder(Scripted(vec![]), trained_model()).build();

  let frames = ContinuousTask::default()
    .run_task(
      ImageFileInput::from_image(camera_image(), false),
      &mut pipeline,
      output,
    )
    .unwrap();
  assert_eq!(frames, 1);
}

#[cfg(feature = "http_stream")]
#[test]
fn mjpeg_stream_of_still_image() {
  use std::io::Read;

  use shouyu::output::{MjpegStream, StreamOutput};

  let pipeline = RecognitionPipeline::builder(Scripted(vec![open_hand()]), trained_model()).build();
  let mut stream = MjpegStream::new(
    ImageFileInput::from_image(camera_image(), false),
    pipeline,
    StreamOutput::new(),
  );

  let mut bytes = Vec::new();
  stream.read_to_end(&mut bytes).unwrap();

  let header = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
  assert!(bytes.starts_with(header));
  assert!(bytes.ends_with(b"\r\n"));
  let jpeg = &bytes[header.len()..bytes.len() - 2];
  let decoded = image::load_from_memory(jpeg).unwrap();
  assert_eq!((decoded.width(), decoded.height()), (640, 480));
}
