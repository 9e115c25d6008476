// 该文件是 Shouyu （手语） 项目的一部分。
// src/model/feature.rs - 特征归一化
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

use crate::model::HandLandmarks;

/// 分类器输入，按关键点顺序交替存放 x、y 偏移
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
  values: Vec<f32>,
}

impl FeatureVector {
  pub fn as_slice(&self) -> &[f32] {
    &self.values
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

/// 将一帧中所有手的关键点转换为特征向量
///
/// 最小 x、y 取自整帧所有关键点，多只手共用同一个原点，而不是每只手各自取最小值。
/// 模型就是按这个约定训练的，不能改为逐手归一化。
/// 结果只有平移不变性，没有缩放、旋转不变性。输入为空时返回空向量。
pub fn normalize(hands: &[HandLandmarks]) -> FeatureVector {
  let points = || hands.iter().flat_map(|hand| hand.points().iter());

  let Some(min_x) = points().map(|p| p.x).reduce(f32::min) else {
    return FeatureVector::default();
  };
  let min_y = points().map(|p| p.y).fold(f32::INFINITY, f32::min);

  let mut values = Vec::with_capacity(hands.len() * 2 * crate::model::HAND_LANDMARK_COUNT);
  for p in points() {
    values.push(p.x - min_x);
    values.push(p.y - min_y);
  }

  FeatureVector { values }
}
