// 该文件是 Shouyu （手语） 项目的一部分。
// src/model/classifier.rs - 分类适配器与标签表
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

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::model::{Classifier, FeatureVector};

/// 识别结果标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignLabel {
  A,
  B,
  G,
  L,
  S,
  Space,
  Nothing,
  Z,
  Y,
  W,
  O,
  P,
  N,
  J,
  /// 没有检测到手、分类失败或类别不在表中
  #[default]
  Unknown,
}

impl SignLabel {
  /// 类别序号到标签的固定映射，序号即模型训练时的类别编号
  pub const TABLE: [SignLabel; 14] = [
    SignLabel::A,
    SignLabel::B,
    SignLabel::G,
    SignLabel::L,
    SignLabel::S,
    SignLabel::Space,
    SignLabel::Nothing,
    SignLabel::Z,
    SignLabel::Y,
    SignLabel::W,
    SignLabel::O,
    SignLabel::P,
    SignLabel::N,
    SignLabel::J,
  ];

  pub fn from_class_index(index: usize) -> SignLabel {
    Self::TABLE.get(index).copied().unwrap_or(SignLabel::Unknown)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      SignLabel::A => "A",
      SignLabel::B => "B",
      SignLabel::G => "G",
      SignLabel::L => "L",
      SignLabel::S => "S",
      SignLabel::Space => "Space",
      SignLabel::Nothing => "nothing",
      SignLabel::Z => "Z",
      SignLabel::Y => "Y",
      SignLabel::W => "W",
      SignLabel::O => "O",
      SignLabel::P => "P",
      SignLabel::N => "N",
      SignLabel::J => "J",
      SignLabel::Unknown => "unknown",
    }
  }

  /// 界面上显示的文字，未知显示为 `?`
  pub fn glyph(self) -> &'static str {
    match self {
      SignLabel::Unknown => "?",
      other => other.as_str(),
    }
  }

  pub fn is_known(self) -> bool {
    self != SignLabel::Unknown
  }
}

impl fmt::Display for SignLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Error, Debug)]
pub enum ClassifyError {
  #[error("特征向量长度不匹配: 模型期望 {expected}, 实际 {actual}")]
  ShapeMismatch { expected: usize, actual: usize },
  #[error("模型预测失败: {0}")]
  Model(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// 分类适配器
///
/// 在调用模型前检查特征宽度。多只手时宽度必然不符，这是预期内的可恢复情况。
pub struct ClassifierAdapter<C> {
  model: C,
}

impl<C: Classifier> ClassifierAdapter<C> {
  pub fn new(model: C) -> Self {
    Self { model }
  }

  pub fn model(&self) -> &C {
    &self.model
  }

  pub fn classify(&self, features: &FeatureVector) -> Result<usize, ClassifyError> {
    let expected = self.model.input_width();
    if features.len() != expected {
      return Err(ClassifyError::ShapeMismatch {
        expected,
        actual: features.len(),
      });
    }

    let index = self
      .model
      .predict(features.as_slice())
      .map_err(|e| ClassifyError::Model(Box::new(e)))?;
    debug!("模型输出类别: {}", index);
    Ok(index)
  }

  pub fn label_for(&self, index: usize) -> SignLabel {
    SignLabel::from_class_index(index)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{HandLandmarks, LandmarkPoint, normalize};

  #[derive(Debug, Error)]
  #[error("boom")]
  struct Boom;

  struct Fixed {
    width: usize,
    answer: Result<usize, ()>,
  }

  impl Classifier for Fixed {
    type Error = Boom;

    fn input_width(&self) -> usize {
      self.width
    }

    fn predict(&self, _features: &[f32]) -> Result<usize, Self::Error> {
      self.answer.map_err(|_| Boom)
    }
  }

  fn one_hand() -> FeatureVector {
    normalize(&[HandLandmarks::new([LandmarkPoint::new(0.2, 0.3); 21])])
  }

  #[test]
  fn lookup_is_total() {
    let expected = [
      "A", "B", "G", "L", "S", "Space", "nothing", "Z", "Y", "W", "O", "P", "N", "J",
    ];
    for (index, name) in expected.iter().enumerate() {
      assert_eq!(SignLabel::from_class_index(index).as_str(), *name);
    }
    for index in [14, 15, 100, usize::MAX] {
      assert_eq!(SignLabel::from_class_index(index), SignLabel::Unknown);
    }
    assert_eq!(SignLabel::Unknown.as_str(), "unknown");
    assert_eq!(SignLabel::Unknown.glyph(), "?");
    assert_eq!(SignLabel::Space.glyph(), "Space");
  }

  #[test]
  fn width_is_checked_before_prediction() {
    let adapter = ClassifierAdapter::new(Fixed {
      width: 84,
      answer: Ok(0),
    });
    assert!(matches!(
      adapter.classify(&one_hand()),
      Err(ClassifyError::ShapeMismatch {
        expected: 84,
        actual: 42
      })
    ));
  }

  #[test]
  fn model_errors_are_wrapped() {
    let adapter = ClassifierAdapter::new(Fixed {
      width: 42,
      answer: Err(()),
    });
    assert!(matches!(
      adapter.classify(&one_hand()),
      Err(ClassifyError::Model(_))
    ));
  }

  #[test]
  fn successful_prediction_maps_to_label() {
    let adapter = ClassifierAdapter::new(Fixed {
      width: 42,
      answer: Ok(3),
    });
    let index = adapter.classify(&one_hand()).unwrap();
    assert_eq!(adapter.label_for(index), SignLabel::L);
  }
}
