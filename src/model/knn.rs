// 该文件是 Shouyu （手语） 项目的一部分。
// src/model/knn.rs - 最近邻分类模型
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

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, model::Classifier};

#[derive(Error, Debug)]
pub enum KnnError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型格式错误: {0}")]
  ModelFormatError(#[from] serde_json::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("特征向量长度不匹配: 期望 {expected}, 实际 {actual}")]
  WidthMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Deserialize)]
struct Sample {
  class: usize,
  features: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ModelFile {
  input_width: usize,
  #[serde(default = "default_k")]
  k: usize,
  samples: Vec<Sample>,
}

fn default_k() -> usize {
  3
}

/// k 近邻分类器
///
/// 模型文件为 JSON：`{"input_width": 42, "k": 3, "samples": [{"class": 0, "features": [...]}]}`。
/// 欧氏距离，k 个最近样本多数投票，票数相同时取距离最近的样本所属类别。
#[derive(Debug, Clone)]
pub struct KnnClassifier {
  input_width: usize,
  k: usize,
  samples: Vec<Sample>,
}

impl KnnClassifier {
  pub fn from_json_str(json: &str) -> Result<Self, KnnError> {
    let model: ModelFile = serde_json::from_str(json)?;
    Self::validated(model)
  }

  fn validated(model: ModelFile) -> Result<Self, KnnError> {
    if model.samples.is_empty() {
      return Err(KnnError::ModelInvalid("没有训练样本".to_string()));
    }
    if model.k == 0 {
      return Err(KnnError::ModelInvalid("k 必须大于 0".to_string()));
    }
    if let Some(sample) = model
      .samples
      .iter()
      .find(|s| s.features.len() != model.input_width)
    {
      return Err(KnnError::WidthMismatch {
        expected: model.input_width,
        actual: sample.features.len(),
      });
    }

    Ok(KnnClassifier {
      input_width: model.input_width,
      k: model.k,
      samples: model.samples,
    })
  }

  pub fn k(&self) -> usize {
    self.k
  }

  pub fn num_samples(&self) -> usize {
    self.samples.len()
  }
}

impl Classifier for KnnClassifier {
  type Error = KnnError;

  fn input_width(&self) -> usize {
    self.input_width
  }

  fn predict(&self, features: &[f32]) -> Result<usize, Self::Error> {
    if features.len() != self.input_width {
      return Err(KnnError::WidthMismatch {
        expected: self.input_width,
        actual: features.len(),
      });
    }

    let mut distances: Vec<(f32, usize)> = self
      .samples
      .iter()
      .map(|s| {
        let d = s
          .features
          .iter()
          .zip(features)
          .map(|(a, b)| (a - b) * (a - b))
          .sum::<f32>();
        (d, s.class)
      })
      .collect();
    distances.sort_by(|a, b| a.0.total_cmp(&b.0));
    let nearest = &distances[..self.k.min(distances.len())];

    // 记录每个类别的票数与首次出现的位置（越靠前越近）
    let mut votes: HashMap<usize, (usize, usize)> = HashMap::new();
    for (rank, &(_, class)) in nearest.iter().enumerate() {
      votes.entry(class).or_insert((0, rank)).0 += 1;
    }
    let (class, (count, _)) = votes
      .into_iter()
      .max_by(|a, b| a.1.0.cmp(&b.1.0).then(b.1.1.cmp(&a.1.1)))
      .ok_or_else(|| KnnError::ModelInvalid("没有训练样本".to_string()))?;

    debug!("k 近邻投票: 类别 {} 得 {} 票", class, count);
    Ok(class)
  }
}

/// 从 `knn:///path/to/model.json?k=5` 构建
pub struct KnnClassifierBuilder {
  model_path: String,
  k: Option<usize>,
}

impl FromUrlWithScheme for KnnClassifierBuilder {
  const SCHEME: &'static str = "knn";
}

impl FromUrl for KnnClassifierBuilder {
  type Error = KnnError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(KnnError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let k = url
      .query_pairs()
      .find(|(key, _)| key == "k")
      .and_then(|(_, v)| v.parse::<usize>().ok());

    Ok(KnnClassifierBuilder {
      model_path: url.path().to_string(),
      k,
    })
  }
}

impl KnnClassifierBuilder {
  pub fn new(model_path: impl Into<String>) -> Self {
    Self {
      model_path: model_path.into(),
      k: None,
    }
  }

  pub fn k(mut self, k: usize) -> Self {
    self.k = Some(k);
    self
  }

  pub fn build(self) -> Result<KnnClassifier, KnnError> {
    info!("加载模型文件: {}", self.model_path);
    let data = std::fs::read_to_string(&self.model_path)?;
    debug!("模型文件大小: {:.2} KB", data.len() as f64 / 1024.0);

    let mut model: ModelFile = serde_json::from_str(&data)?;
    if let Some(k) = self.k {
      model.k = k;
    }
    let model = KnnClassifier::validated(model)?;
    info!(
      "模型加载完成: 输入宽度 {}, 样本数 {}, k = {}",
      model.input_width,
      model.samples.len(),
      model.k
    );
    Ok(model)
  }
}
