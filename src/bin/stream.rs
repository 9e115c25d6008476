// 该文件是 Shouyu （手语） 项目的一部分。
// src/bin/stream.rs - 浏览器视频流识别服务
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

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use shouyu::{
  FromUrl,
  input::InputWrapper,
  model::{KnnClassifier, KnnClassifierBuilder, SubprocessLandmarker},
  output::{MjpegStream, StreamOutput, Theme, draw::LabelDraw},
  pipeline::RecognitionPipeline,
  server::StreamServer,
};

/// 手语字母识别（MJPEG 视频流）
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 监听地址
  #[arg(long, default_value = "0.0.0.0:5000")]
  pub bind: String,
  /// 分类模型，例如 knn:///path/model.json?k=3
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，每个连接单独打开
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 关键点检测程序的命令行
  #[arg(long, value_name = "COMMAND")]
  pub landmarker: String,
  /// 标签字体（TTF/OTF），不指定时使用内嵌字体
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,
  /// JPEG 质量 (1 - 100)
  #[arg(long, default_value_t = 80)]
  pub quality: u8,
  #[arg(long, default_value = "dark")]
  pub theme: Theme,
  #[arg(long, default_value_t = 1)]
  pub max_hands: usize,
}

type Stream = MjpegStream<InputWrapper, SubprocessLandmarker, KnnClassifier>;

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);

  let classifier = KnnClassifierBuilder::from_url(&args.model)?.build()?;
  let label = match &args.font {
    Some(path) => LabelDraw::from_file(path)?,
    None => LabelDraw::embedded()?,
  };

  let Args {
    bind,
    input,
    landmarker,
    quality,
    theme,
    max_hands,
    ..
  } = args;

  let factory = move || -> Result<Stream> {
    let source = InputWrapper::from_url(&input)?;
    let detector = SubprocessLandmarker::from_command_line(&landmarker)?;
    let pipeline = RecognitionPipeline::builder(detector, classifier.clone())
      .max_hands(max_hands)
      .theme(theme)
      .build();
    let output = StreamOutput::new()
      .with_quality(quality)
      .with_label(label.clone());
    Ok(MjpegStream::new(source, pipeline, output))
  };

  let server = StreamServer::bind(&bind, factory)?;
  let handle = server.handle();
  ctrlc::set_handler(move || handle.shutdown())?;

  info!("打开 http://{} 查看视频流", bind);
  server.run();

  Ok(())
}
