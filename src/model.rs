// 该文件是 Shouyu （手语） 项目的一部分。
// src/model.rs - 模型
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

mod classifier;
mod feature;
mod knn;
mod landmark;
mod subprocess;

pub use self::classifier::{ClassifierAdapter, ClassifyError, SignLabel};
pub use self::feature::{FeatureVector, normalize};
pub use self::knn::{KnnClassifier, KnnClassifierBuilder, KnnError};
pub use self::landmark::{
  Finger, HAND_LANDMARK_COUNT, HandLandmarks, LandmarkAdapter, LandmarkPoint, RawHand,
};
pub use self::subprocess::{SubprocessLandmarker, SubprocessLandmarkerError};

/// 手部关键点检测能力
///
/// 输入为镜像后的 RGB 图像，输出每只手的关键点（归一化坐标）。
/// 实现方不需要保证形状，形状校验由 [`LandmarkAdapter`] 负责。
pub trait LandmarkDetector {
  type Error: std::error::Error + Send + Sync + 'static;

  fn detect(&mut self, image: &image::RgbImage) -> Result<Vec<RawHand>, Self::Error>;
}

/// 预训练分类模型
pub trait Classifier {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 模型期望的特征向量长度
  fn input_width(&self) -> usize;

  fn predict(&self, features: &[f32]) -> Result<usize, Self::Error>;
}

impl<D: LandmarkDetector + ?Sized> LandmarkDetector for Box<D> {
  type Error = D::Error;

  fn detect(&mut self, image: &image::RgbImage) -> Result<Vec<RawHand>, Self::Error> {
    (**self).detect(image)
  }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
  type Error = C::Error;

  fn input_width(&self) -> usize {
    (**self).input_width()
  }

  fn predict(&self, features: &[f32]) -> Result<usize, Self::Error> {
    (**self).predict(features)
  }
}
