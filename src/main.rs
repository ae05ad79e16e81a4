// src/main.rs
mod gui;
mod simulator;
mod types;
use anyhow::Context;
use eframe::egui;
use waveview::RendererConfig;

// 与采集器约定的设备编号
const DEVICE_IDS: [&str; 4] = ["01000341", "01000342", "01000343", "01000344"];

fn load_config() -> anyhow::Result<RendererConfig> {
    // 第一个命令行参数：可选的 JSON 配置文件
    match std::env::args().nth(1) {
        Some(path) => {
            RendererConfig::load(&path).with_context(|| format!("loading renderer config {path}"))
        }
        None => Ok(RendererConfig::bedside_monitor(600.0, 200.0)),
    }
}

// 入口函数
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = load_config()?;
    let devices = DEVICE_IDS.iter().map(|id| id.to_string()).collect();
    let app = gui::WaveMonitorApp::new(config, devices)?;
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([960.0, 1000.0])
        .with_min_inner_size([720.0, 480.0])
        .with_title("Wave Monitor");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native("waveview", options, Box::new(move |_cc| Box::new(app)))
        .map_err(|err| anyhow::anyhow!("gui failed: {err}"))
}
