//! reel-probe - 容器探测与解复用检查工具
//!
//! 打开一个媒体文件, 列出容器格式, 流, 被忽略的流与时长;
//! 可选地通过解复用器拉取选中视频流的全部数据包.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::process;

use reel::config::ReelConfig;
use reel_codec::CodecRegistry;
use reel_core::MediaType;
use reel_demux::{Demultiplexer, DemuxerConfig, FeedStatus, PlaybackClock};
use reel_format::{FormatRegistry, InputContext, MediaSource, Stream, StreamParams};

/// Reel 容器探测工具
#[derive(Parser, Debug)]
#[command(name = "reel-probe", version, about = "容器探测与解复用检查工具")]
struct Cli {
    /// 输入文件路径
    input: Option<String>,

    /// JSON 配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 通过解复用器读取选中视频流的全部数据包
    #[arg(long)]
    show_packets: bool,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 列出可读取的容器格式
    #[arg(long)]
    list_formats: bool,

    /// 列出可用的解码器
    #[arg(long)]
    list_decoders: bool,

    /// 日志详细程度 (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ============================================================
// JSON 输出结构体
// ============================================================

#[derive(Serialize)]
struct ProbeOutput {
    format: FormatInfo,
    streams: Vec<StreamInfo>,
    ignored_streams: Vec<IgnoredInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    packets: Option<PacketSummary>,
}

#[derive(Serialize)]
struct FormatInfo {
    filename: String,
    format_name: String,
    nb_streams: usize,
    duration: f64,
}

#[derive(Serialize)]
struct StreamInfo {
    index: usize,
    codec_type: String,
    codec_name: String,
    time_base: String,
    selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channels: Option<u32>,
}

#[derive(Serialize)]
struct IgnoredInfo {
    index: usize,
    reason: String,
}

#[derive(Serialize)]
struct PacketSummary {
    stream_index: usize,
    packets: u64,
    bytes: u64,
    keyframes: u64,
    packets_read: u64,
    discarded: u64,
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ReelConfig::load(path)?,
        None => ReelConfig::default(),
    };
    reel::logging::init(&config.logging, cli.verbose)?;

    if cli.list_formats {
        for c in reel_demux::available_containers() {
            println!("{:<10} {}", c.name, c.long_name);
        }
        return Ok(());
    }
    if cli.list_decoders {
        for d in reel_demux::available_decoders() {
            println!("{:<10} {:<9} {}", d.name, d.media_type, d.long_name);
        }
        return Ok(());
    }

    let Some(input) = cli.input.as_deref() else {
        print_banner();
        return Ok(());
    };
    tracing::info!("输入文件: {input}");

    let output = inspect(input, &config.demuxer, cli.show_packets)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text(&output);
    }
    Ok(())
}

/// 打开输入一次, 收集容器与流信息后交给解复用器
fn inspect(input: &str, config: &DemuxerConfig, show_packets: bool) -> Result<ProbeOutput> {
    let mut formats = FormatRegistry::new();
    reel_format::register_all(&mut formats);
    let mut codecs = CodecRegistry::new();
    reel_codec::register_all(&mut codecs);

    let source = InputContext::open(input, &formats)?;
    let format_name = source.format_name().to_string();
    let nb_streams = source.streams().len();
    let mut streams: Vec<StreamInfo> = source.streams().iter().map(build_stream_info).collect();

    let demuxer = Demultiplexer::from_source(Box::new(source), &codecs, PlaybackClock::new(), config)
        .with_context(|| format!("无法解复用 '{input}'"))?;
    let selected = demuxer.selected_stream(MediaType::Video);
    if let Some(descriptor) = &selected {
        for info in streams.iter_mut() {
            info.selected = info.index == descriptor.identifier;
        }
    }

    Ok(ProbeOutput {
        format: FormatInfo {
            filename: input.to_string(),
            format_name,
            nb_streams,
            duration: demuxer.duration().as_secs_f64(),
        },
        streams,
        ignored_streams: demuxer
            .ignored_streams()
            .iter()
            .map(|(index, reason)| IgnoredInfo {
                index: *index,
                reason: reason.clone(),
            })
            .collect(),
        packets: match (&selected, show_packets) {
            (Some(descriptor), true) => Some(pull_packets(&demuxer, descriptor.identifier)?),
            _ => None,
        },
    })
}

/// 持续拉取直到容器读完, 统计交付给该流的数据包
fn pull_packets(demuxer: &Demultiplexer, stream_index: usize) -> Result<PacketSummary> {
    let mut summary = PacketSummary {
        stream_index,
        packets: 0,
        bytes: 0,
        keyframes: 0,
        packets_read: 0,
        discarded: 0,
    };
    loop {
        let status = demuxer.feed(stream_index)?;
        while let Some(packet) = demuxer.take_packet(stream_index)? {
            tracing::trace!(
                "packet stream={} dts={} pts={} size={} key={}",
                packet.stream_index,
                packet.dts,
                packet.pts,
                packet.size(),
                packet.is_keyframe
            );
            summary.packets += 1;
            summary.bytes += packet.size() as u64;
            summary.keyframes += u64::from(packet.is_keyframe);
        }
        if status == FeedStatus::EndOfFile {
            break;
        }
    }
    let stats = demuxer.stats();
    summary.packets_read = stats.packets_read;
    summary.discarded = stats.discarded;
    Ok(summary)
}

fn build_stream_info(stream: &Stream) -> StreamInfo {
    let mut info = StreamInfo {
        index: stream.index,
        codec_type: stream.media_type.to_string(),
        codec_name: stream.codec_id.name().to_string(),
        time_base: stream.time_base.to_string(),
        selected: false,
        language: stream.language().map(str::to_string),
        width: None,
        height: None,
        sample_rate: None,
        channels: None,
    };
    match &stream.params {
        StreamParams::Video(v) => {
            info.width = Some(v.width);
            info.height = Some(v.height);
        }
        StreamParams::Audio(a) => {
            info.sample_rate = Some(a.sample_rate);
            info.channels = Some(a.channels);
        }
        StreamParams::Other => {}
    }
    info
}

fn print_text(output: &ProbeOutput) {
    let f = &output.format;
    println!("输入: {} ({})", f.filename, f.format_name);
    println!("  时长: {:.3}s, 流数量: {}", f.duration, f.nb_streams);
    for s in &output.streams {
        let mark = if s.selected { "*" } else { " " };
        print!("  {mark}#{} {}: {} [{}]", s.index, s.codec_type, s.codec_name, s.time_base);
        if let (Some(w), Some(h)) = (s.width, s.height) {
            print!(", {w}x{h}");
        }
        if let (Some(rate), Some(ch)) = (s.sample_rate, s.channels) {
            print!(", {rate} Hz, {ch} ch");
        }
        if let Some(lang) = &s.language {
            print!(" ({lang})");
        }
        println!();
    }
    for i in &output.ignored_streams {
        println!("  忽略 #{}: {}", i.index, i.reason);
    }
    if let Some(p) = &output.packets {
        println!(
            "  数据包 #{}: {} 个, {} 字节, {} 个关键帧 (读取 {}, 丢弃 {})",
            p.stream_index, p.packets, p.bytes, p.keyframes, p.packets_read, p.discarded
        );
    }
}

fn print_banner() {
    eprintln!(
        "reel-probe 版本 {} -- 容器探测与解复用检查工具",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!("用法: reel-probe [选项] <输入文件>");
    eprintln!("      reel-probe --list-formats | --list-decoders");
}
