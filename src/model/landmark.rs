// 该文件是 Shouyu （手语） 项目的一部分。
// src/model/landmark.rs - 手部关键点
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
use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::LandmarkDetector;

/// 每只手的关键点数量
pub const HAND_LANDMARK_COUNT: usize = 21;

// 归一化坐标允许略微超出画面，超出此范围视为检测器输出异常
const COORDINATE_RANGE: std::ops::RangeInclusive<f32> = -1.0..=2.0;

/// 关键点，坐标相对于帧宽高归一化
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct LandmarkPoint {
  pub x: f32,
  pub y: f32,
}

impl LandmarkPoint {
  pub fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }

  /// 像素坐标，向零截断
  pub fn to_pixel(self, width: u32, height: u32) -> (i32, i32) {
    (
      (self.x * width as f32) as i32,
      (self.y * height as f32) as i32,
    )
  }
}

/// 检测器原始输出的一只手，尚未校验
pub type RawHand = Vec<LandmarkPoint>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
  Thumb,
  Index,
  Middle,
  Ring,
  Pinky,
}

impl Finger {
  pub const ALL: [Finger; 5] = [
    Finger::Thumb,
    Finger::Index,
    Finger::Middle,
    Finger::Ring,
    Finger::Pinky,
  ];

  /// 关键点所属的手指，手腕（0）不属于任何手指
  pub fn of(index: usize) -> Option<Finger> {
    match index {
      1..=4 => Some(Finger::Thumb),
      5..=8 => Some(Finger::Index),
      9..=12 => Some(Finger::Middle),
      13..=16 => Some(Finger::Ring),
      17..=20 => Some(Finger::Pinky),
      _ => None,
    }
  }
}

/// 一只手的 21 个关键点
///
/// 0 为手腕，1–20 每四个点一根手指（拇指、食指、中指、无名指、小指）。
/// 骨架连线依赖这个固定顺序。
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
  points: [LandmarkPoint; HAND_LANDMARK_COUNT],
}

impl HandLandmarks {
  pub fn new(points: [LandmarkPoint; HAND_LANDMARK_COUNT]) -> Self {
    Self { points }
  }

  /// 校验原始输出，点数不为 21 或坐标超出 `[-1, 2]`（含非有限值）时返回 `None`
  pub fn from_raw(raw: &[LandmarkPoint]) -> Option<Self> {
    let points: [LandmarkPoint; HAND_LANDMARK_COUNT] = raw.try_into().ok()?;
    if points
      .iter()
      .all(|p| COORDINATE_RANGE.contains(&p.x) && COORDINATE_RANGE.contains(&p.y))
    {
      Some(Self { points })
    } else {
      None
    }
  }

  pub fn points(&self) -> &[LandmarkPoint; HAND_LANDMARK_COUNT] {
    &self.points
  }

  pub fn wrist(&self) -> LandmarkPoint {
    self.points[0]
  }
}

/// 关键点检测适配器
///
/// 只做形状校验与数量限制：畸形的手直接丢弃，检测器出错视为本帧没有手。
pub struct LandmarkAdapter<D> {
  detector: D,
  max_hands: usize,
}

impl<D: LandmarkDetector> LandmarkAdapter<D> {
  pub fn new(detector: D, max_hands: usize) -> Self {
    Self {
      detector,
      max_hands,
    }
  }

  pub fn max_hands(&self) -> usize {
    self.max_hands
  }

  pub fn detect(&mut self, image: &RgbImage) -> Vec<HandLandmarks> {
    let raw = match self.detector.detect(image) {
      Ok(raw) => raw,
      Err(e) => {
        warn!("关键点检测失败，按未检测到手处理: {}", e);
        return Vec::new();
      }
    };

    let total = raw.len();
    let hands: Vec<HandLandmarks> = raw
      .iter()
      .filter_map(|hand| {
        let validated = HandLandmarks::from_raw(hand);
        if validated.is_none() {
          warn!("丢弃畸形的手: {} 个关键点", hand.len());
        }
        validated
      })
      .take(self.max_hands)
      .collect();

    debug!("检测到 {} 只手，保留 {} 只", total, hands.len());
    hands
  }
}
