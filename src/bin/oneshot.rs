// 该文件是 Shouyu （手语） 项目的一部分。
// src/bin/oneshot.rs - 单张图片识别
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

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use shouyu::{
  FromUrl,
  input::ImageFileInput,
  model::{KnnClassifierBuilder, SubprocessLandmarker},
  output::{DesktopOutput, SaveImageFileOutput, Theme},
  pipeline::RecognitionPipeline,
  task::{OneShotTask, Task},
};

/// 识别单张图片中的手语字母，保存标注后的图片并输出结果
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 分类模型，例如 knn:///path/model.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图片，例如 image:///path/hand.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出图片，例如 image:///path/out.png
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 关键点检测程序的命令行
  #[arg(long, value_name = "COMMAND")]
  pub landmarker: String,
  #[arg(long, default_value = "dark")]
  pub theme: Theme,
  #[arg(long, default_value_t = 1)]
  pub max_hands: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = ImageFileInput::from_url(&args.input)?;
  let classifier = KnnClassifierBuilder::from_url(&args.model)?.build()?;
  let detector = SubprocessLandmarker::from_command_line(&args.landmarker)?;
  let mut pipeline = RecognitionPipeline::builder(detector, classifier)
    .max_hands(args.max_hands)
    .theme(args.theme)
    .build();
  let output = DesktopOutput::new(SaveImageFileOutput::from_url(&args.output)?);

  let label = OneShotTask.run_task(input, &mut pipeline, output)?;
  println!("{}", label);

  Ok(())
}
