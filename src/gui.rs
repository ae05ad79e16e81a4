// src/gui.rs
use crate::simulator;
use crate::types::*;
use anyhow::Context;
use eframe::egui;
use egui::{Color32, TextureHandle, TextureOptions, Vec2};
use std::collections::BTreeMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use waveview::render::{Color, RasterSurface};
use waveview::{RenderSurface, RendererConfig, RendererState, Subscriptions, WaveRenderer};

type MonitorView = WaveRenderer<RasterSurface>;

pub struct WaveMonitorApp {
    // 每台设备一个波形视图
    views: Subscriptions<MonitorView>,
    textures: BTreeMap<String, TextureHandle>,
    streaming: BTreeMap<String, bool>,
    tick_interval: Duration,

    // 可见性 (最小化或手动隐藏时暂停绘制)
    show_waves: bool,
    hidden: bool,
    dropout: bool,

    log_messages: Vec<String>,

    // 通讯管道
    rx: Receiver<DeviceMessage>,
    tx_cmd: Sender<GuiCommand>,
}

impl WaveMonitorApp {
    pub fn new(config: RendererConfig, device_ids: Vec<String>) -> anyhow::Result<Self> {
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();

        let (width, height) = surface_size(&config);
        let mut views = Subscriptions::new();
        for id in &device_ids {
            let surface = RasterSurface::new(width, height, Color::BLACK);
            let mut view = WaveRenderer::new(surface, &config)
                .with_context(|| format!("failed to build renderer for device {id}"))?;
            view.start();
            views.subscribe(id.clone(), view);
        }

        // 启动模拟采集器，并打开所有设备的数据流
        simulator::spawn_thread(device_ids.clone(), tx, rx_cmd);
        for id in &device_ids {
            tx_cmd.send(GuiCommand::StartStream(id.clone())).ok();
        }

        Ok(Self {
            views,
            textures: BTreeMap::new(),
            streaming: BTreeMap::new(),
            tick_interval: config.tick_interval(),
            show_waves: true,
            hidden: false,
            dropout: false,
            log_messages: vec!["Wave monitor ready.".to_owned()],
            rx,
            tx_cmd,
        })
    }

    fn log(&mut self, msg: &str) {
        log::info!("{msg}");
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > 12 {
            self.log_messages.remove(0);
        }
    }

    fn drain_messages(&mut self) {
        let mut msg_count = 0;
        while let Ok(msg) = self.rx.try_recv() {
            msg_count += 1;
            match msg {
                DeviceMessage::Log(s) => self.log(&s),
                DeviceMessage::Streaming(id, on) => {
                    self.streaming.insert(id, on);
                }
                DeviceMessage::Payload(json) => {
                    if let Err(err) = self.views.dispatch_json(&json) {
                        self.log(&format!("Dropped packet: {err}"));
                    }
                }
            }
            if msg_count >= 50 {
                break;
            }
        }
    }

    // 窗口隐藏 -> pause，重新可见 -> resume
    fn sync_visibility(&mut self, ctx: &egui::Context) {
        let minimized = ctx.input(|i| i.viewport().minimized.unwrap_or(false));
        let hidden = minimized || !self.show_waves;
        if hidden == self.hidden {
            return;
        }
        self.hidden = hidden;
        for (_, view) in self.views.iter_mut() {
            if hidden {
                view.pause();
            } else {
                view.resume();
            }
        }
        self.log(if hidden { "View hidden, paused" } else { "View visible, resumed" });
    }

    fn upload_textures(&mut self, ctx: &egui::Context) {
        for (id, view) in self.views.iter_mut() {
            let surface = view.surface_mut();
            if !surface.take_dirty() {
                continue;
            }
            let (w, h) = surface.pixel_size();
            let image = egui::ColorImage::from_rgb([w as usize, h as usize], surface.pixels());
            match self.textures.get_mut(id) {
                Some(texture) => texture.set(image, TextureOptions::LINEAR),
                None => {
                    let texture = ctx.load_texture(format!("wave-{id}"), image, TextureOptions::LINEAR);
                    self.textures.insert(id.to_owned(), texture);
                }
            }
        }
    }

    fn save_snapshot(&mut self, device_id: &str) {
        let Some(view) = self.views.get_mut(device_id) else { return };
        match write_snapshot(device_id, view) {
            Ok(path) => self.log(&format!("Saved {path}")),
            Err(err) => self.log(&format!("Snapshot failed: {err:#}")),
        }
    }
}

fn write_snapshot(device_id: &str, view: &MonitorView) -> anyhow::Result<String> {
    let png = view.surface().encode_png().context("encoding png")?;
    let stamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let path = format!("snapshot_{device_id}_{stamp}.png");
    std::fs::write(&path, png).with_context(|| format!("writing {path}"))?;
    Ok(path)
}

/// Smallest surface that holds every channel region.
fn surface_size(config: &RendererConfig) -> (u32, u32) {
    let (w, h) = config.channels.iter().fold((1.0f64, 1.0f64), |(w, h), ch| {
        let right = ch.start_x.unwrap_or(0.0) + ch.width;
        let bottom = ch.start_y.unwrap_or(0.0) + ch.height;
        (w.max(right), h.max(bottom))
    });
    (w.ceil() as u32, h.ceil() as u32)
}

fn state_label(state: RendererState) -> (&'static str, Color32) {
    match state {
        RendererState::Running => ("RUNNING", Color32::GREEN),
        RendererState::Paused => ("PAUSED", Color32::YELLOW),
        RendererState::Stopped => ("STOPPED", Color32::GRAY),
    }
}

impl eframe::App for WaveMonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. 消息处理
        self.drain_messages();

        // 2. 可见性同步
        self.sync_visibility(ctx);

        // 3. 调度：每帧最多执行一次到期的 tick
        for (_, view) in self.views.iter_mut() {
            view.poll();
        }
        self.upload_textures(ctx);

        // 4. UI 绘制
        let mut visuals = egui::Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 10, 15);
        ctx.set_visuals(visuals);

        egui::SidePanel::left("controls").min_width(240.0).show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("Wave Monitor");
            ui.label("ECG / Respiration");
            ui.separator();

            ui.checkbox(&mut self.show_waves, "Visible");
            if ui.checkbox(&mut self.dropout, "Interrupt signal").changed() {
                self.tx_cmd.send(GuiCommand::SetDropout(self.dropout)).ok();
            }

            ui.add_space(10.0);
            egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
                for m in &self.log_messages {
                    ui.monospace(m);
                }
            });
        });

        let mut snapshot_requests = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                for (id, view) in self.views.iter_mut() {
                    let (state, color) = state_label(view.state());
                    let streaming = self.streaming.get(id).copied().unwrap_or(false);
                    ui.horizontal(|ui| {
                        ui.label(format!("Device ID: {id}"));
                        ui.label(egui::RichText::new(state).color(color).strong());
                        if !streaming {
                            ui.label(egui::RichText::new("no stream").small());
                        }
                        if ui.button("Start").clicked() {
                            view.start();
                            self.tx_cmd.send(GuiCommand::StartStream(id.to_owned())).ok();
                        }
                        if ui.button("Stop").clicked() {
                            view.stop();
                            self.tx_cmd.send(GuiCommand::StopStream(id.to_owned())).ok();
                        }
                        if ui.button("Save PNG").clicked() {
                            snapshot_requests.push(id.to_owned());
                        }
                    });
                    if let Some(texture) = self.textures.get(id) {
                        let size = Vec2::new(view.surface().width() as f32, view.surface().height() as f32);
                        ui.image((texture.id(), size));
                    }
                    ui.add_space(6.0);
                }
            });
        });
        for id in snapshot_requests {
            self.save_snapshot(&id);
        }

        ctx.request_repaint_after(self.tick_interval / 2);
    }
}

impl Drop for WaveMonitorApp {
    fn drop(&mut self) {
        self.tx_cmd.send(GuiCommand::Shutdown).ok();
        let ids: Vec<String> = self.views.iter().map(|(id, _)| id.to_owned()).collect();
        for id in ids {
            // 取消订阅
            if let Some(mut view) = self.views.unsubscribe(&id) {
                view.stop();
            }
        }
    }
}
