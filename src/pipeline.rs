// 该文件是 Shouyu （手语） 项目的一部分。
// src/pipeline.rs - 单帧识别流程
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

//! # 识别流程
//!
//! 每帧依次执行：镜像 → 关键点检测 → 骨架绘制 → 归一化 → 分类 → 边框绘制。
//! 流程不保存跨帧状态，检测器与分类器由构建器传入，各个流程实例互不影响。

use image::RgbImage;
use tracing::{debug, warn};

use crate::{
  frame::RawFrame,
  model::{
    Classifier, ClassifierAdapter, LandmarkAdapter, LandmarkDetector, SignLabel, normalize,
  },
  output::{
    Palette, Theme, ThemeSwitch,
    draw::{BoundingBox, draw_box, draw_skeleton},
  },
};

const DEFAULT_MAX_HANDS: usize = 1;

/// 单帧的处理结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
  NoHand,
  /// 检测到手；`classified` 为 `false` 表示分类失败，只画了骨架
  Detected { classified: bool },
}

/// 一帧的识别结果
#[derive(Debug, Clone)]
pub struct Recognition {
  /// 镜像后的 RGB 画面，检测到手时已绘制叠加层
  pub image: RgbImage,
  pub label: SignLabel,
  pub state: FrameState,
  /// 分类成功时的边框
  pub bbox: Option<BoundingBox>,
  /// 绘制叠加层使用的配色，后续输出沿用
  pub palette: Palette,
}

pub struct RecognitionPipelineBuilder<D, C> {
  detector: D,
  classifier: C,
  max_hands: usize,
  theme: ThemeSwitch,
}

impl<D: LandmarkDetector, C: Classifier> RecognitionPipelineBuilder<D, C> {
  pub fn max_hands(mut self, max_hands: usize) -> Self {
    self.max_hands = max_hands;
    self
  }

  pub fn theme(self, theme: Theme) -> Self {
    self.theme.set(theme);
    self
  }

  /// 与界面共享主题，界面切换后从下一帧开始生效
  pub fn theme_switch(mut self, switch: ThemeSwitch) -> Self {
    self.theme = switch;
    self
  }

  pub fn build(self) -> RecognitionPipeline<D, C> {
    debug!(
      "识别流程: 最多 {} 只手, 主题 {:?}, 模型输入宽度 {}",
      self.max_hands,
      self.theme.get(),
      self.classifier.input_width()
    );
    RecognitionPipeline {
      landmarks: LandmarkAdapter::new(self.detector, self.max_hands),
      classifier: ClassifierAdapter::new(self.classifier),
      theme: self.theme,
    }
  }
}

pub struct RecognitionPipeline<D, C> {
  landmarks: LandmarkAdapter<D>,
  classifier: ClassifierAdapter<C>,
  theme: ThemeSwitch,
}

impl<D: LandmarkDetector, C: Classifier> RecognitionPipeline<D, C> {
  pub fn builder(detector: D, classifier: C) -> RecognitionPipelineBuilder<D, C> {
    RecognitionPipelineBuilder {
      detector,
      classifier,
      max_hands: DEFAULT_MAX_HANDS,
      theme: ThemeSwitch::default(),
    }
  }

  pub fn theme(&self) -> Theme {
    self.theme.get()
  }

  pub fn set_theme(&mut self, theme: Theme) {
    self.theme.set(theme);
  }

  pub fn theme_switch(&self) -> ThemeSwitch {
    self.theme.clone()
  }

  /// 处理输入源的原始帧
  pub fn process(&mut self, frame: &RawFrame) -> Recognition {
    self.recognize(frame.to_mirrored_rgb())
  }

  /// 处理已经镜像的 RGB 画面
  pub fn recognize(&mut self, mut image: RgbImage) -> Recognition {
    let palette = self.theme.get().palette();
    let hands = self.landmarks.detect(&image);
    if hands.is_empty() {
      return Recognition {
        image,
        label: SignLabel::Unknown,
        state: FrameState::NoHand,
        bbox: None,
        palette,
      };
    }

    draw_skeleton(&mut image, &hands, &palette);

    let features = normalize(&hands);
    match self.classifier.classify(&features) {
      Ok(index) => {
        let label = self.classifier.label_for(index);
        let (width, height) = image.dimensions();
        let bbox = BoundingBox::around(&hands, width, height);
        if let Some(bbox) = bbox {
          draw_box(&mut image, bbox, &palette);
        }
        debug!("识别结果: {} (类别 {})", label, index);
        Recognition {
          image,
          label,
          state: FrameState::Detected { classified: true },
          bbox,
          palette,
        }
      }
      Err(e) => {
        warn!("分类失败，结果记为未知: {}", e);
        Recognition {
          image,
          label: SignLabel::Unknown,
          state: FrameState::Detected { classified: false },
          bbox: None,
          palette,
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use image::Rgb;

  use super::*;
  use crate::{
    frame::ChannelOrder,
    model::{LandmarkPoint, RawHand},
  };

  struct Fixed(Vec<RawHand>);

  impl LandmarkDetector for Fixed {
    type Error = std::convert::Infallible;

    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<RawHand>, Self::Error> {
      Ok(self.0.clone())
    }
  }

  struct Answer(usize);

  impl Classifier for Answer {
    type Error = std::convert::Infallible;

    fn input_width(&self) -> usize {
      42
    }

    fn predict(&self, _features: &[f32]) -> Result<usize, Self::Error> {
      Ok(self.0)
    }
  }

  fn hand(offset: f32) -> RawHand {
    (0..21)
      .map(|i| LandmarkPoint::new(offset + (i % 5) as f32 * 0.0625, 0.25 + (i / 5) as f32 * 0.125))
      .collect()
  }

  fn gray_frame() -> RawFrame {
    RawFrame::new(640, 480, ChannelOrder::Bgr, vec![64; 640 * 480 * 3]).unwrap()
  }

  #[test]
  fn no_hand_leaves_frame_untouched() {
    let frame = gray_frame();
    let mut pipeline = RecognitionPipeline::builder(Fixed(vec![]), Answer(0)).build();
    let result = pipeline.process(&frame);
    assert_eq!(result.label, SignLabel::Unknown);
    assert_eq!(result.state, FrameState::NoHand);
    assert_eq!(result.image, frame.to_mirrored_rgb());
  }

  #[test]
  fn two_hands_fail_classification_but_keep_skeleton() {
    let frame = gray_frame();
    let mut pipeline = RecognitionPipeline::builder(Fixed(vec![hand(0.1), hand(0.6)]), Answer(0))
      .max_hands(2)
      .build();
    let result = pipeline.process(&frame);
    assert_eq!(result.label, SignLabel::Unknown);
    assert_eq!(result.state, FrameState::Detected { classified: false });
    assert!(result.bbox.is_none());
    assert_ne!(result.image, frame.to_mirrored_rgb());
  }

  #[test]
  fn recognized_hand_gets_label_and_box() {
    let mut pipeline = RecognitionPipeline::builder(Fixed(vec![hand(0.25)]), Answer(0)).build();
    let result = pipeline.process(&gray_frame());
    assert_eq!(result.label, SignLabel::A);
    assert_eq!(result.state, FrameState::Detected { classified: true });

    let bbox = result.bbox.unwrap();
    assert_eq!((bbox.x1, bbox.y1, bbox.x2, bbox.y2), (150, 110, 330, 370));
    let frame_color = Theme::Dark.palette().frame;
    assert_eq!(*result.image.get_pixel(170, 109), frame_color);
    assert_eq!(*result.image.get_pixel(171, 109), Rgb([64, 64, 64]));
  }

  #[test]
  fn out_of_table_index_is_unknown_with_box() {
    let mut pipeline = RecognitionPipeline::builder(Fixed(vec![hand(0.25)]), Answer(99)).build();
    let result = pipeline.process(&gray_frame());
    assert_eq!(result.label, SignLabel::Unknown);
    assert!(result.bbox.is_some());
  }

  #[test]
  fn theme_switch_changes_overlay_only() {
    let frame = gray_frame();
    let mut pipeline = RecognitionPipeline::builder(Fixed(vec![hand(0.25)]), Answer(3))
      .theme(Theme::Light)
      .build();
    let light = pipeline.process(&frame);
    pipeline.set_theme(Theme::Dark);
    let dark = pipeline.process(&frame);

    assert_eq!(light.label, dark.label);
    assert_eq!(light.bbox, dark.bbox);
    assert_eq!(*light.image.get_pixel(170, 109), Theme::Light.palette().frame);
    assert_eq!(*dark.image.get_pixel(170, 109), Theme::Dark.palette().frame);
  }

  #[test]
  fn wild_landmark_discards_hand() {
    let mut wild = hand(0.25);
    wild[7] = LandmarkPoint::new(1.0e10, 0.5);
    let frame = RawFrame::from_rgb_image(RgbImage::from_pixel(64, 48, Rgb([64, 64, 64])));
    let mut pipeline = RecognitionPipeline::builder(Fixed(vec![wild]), Answer(0)).build();
    let result = pipeline.process(&frame);
    assert_eq!(result.state, FrameState::NoHand);
    assert_eq!(result.label, SignLabel::Unknown);
    assert_eq!(result.image, frame.to_mirrored_rgb());
  }

  #[test]
  fn shared_switch_changes_next_frame() {
    let frame = gray_frame();
    let switch = ThemeSwitch::new(Theme::Dark);
    let mut pipeline = RecognitionPipeline::builder(Fixed(vec![hand(0.25)]), Answer(0))
      .theme_switch(switch.clone())
      .build();
    assert_eq!(pipeline.process(&frame).palette, Theme::Dark.palette());
    switch.toggle();
    assert_eq!(pipeline.theme(), Theme::Light);
    let light = pipeline.process(&frame);
    assert_eq!(*light.image.get_pixel(170, 109), Theme::Light.palette().frame);
  }

  #[test]
  fn processing_is_deterministic() {
    let frame = gray_frame();
    let mut pipeline = RecognitionPipeline::builder(Fixed(vec![hand(0.25)]), Answer(1)).build();
    let a = pipeline.process(&frame);
    let b = pipeline.process(&frame);
    assert_eq!(a.image.as_raw(), b.image.as_raw());
  }
}
