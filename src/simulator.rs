// src/simulator.rs
// 模拟采集器：每台设备每秒上报一个 JSON 数据包
use crate::types::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use waveview::DevicePacket;

const ECG_RATE_HZ: usize = 200;
const RESP_RATE_HZ: usize = 25;
const PACKET_PERIOD: Duration = Duration::from_secs(1);
const MEDIAN: f64 = 512.0;

struct SimDevice {
    id: String,
    streaming: bool,
    // 设备内部时间 (秒)
    t: f64,
    heart_rate_bpm: f64,
    breath_rate_hz: f64,
}

impl SimDevice {
    fn new(id: String, index: usize) -> Self {
        Self {
            id,
            streaming: false,
            t: 0.0,
            heart_rate_bpm: 66.0 + index as f64 * 7.0,
            breath_rate_hz: 0.22 + index as f64 * 0.03,
        }
    }

    // P-QRS-T 波形由高斯峰叠加
    fn ecg_at(&self, t: f64) -> f64 {
        let phase = (t * self.heart_rate_bpm / 60.0).fract();
        let wave = |center: f64, amp: f64, width: f64| {
            let d = (phase - center) / width;
            amp * (-0.5 * d * d).exp()
        };
        wave(0.20, 8.0, 0.025) + wave(0.35, -10.0, 0.010) + wave(0.37, 60.0, 0.012)
            + wave(0.39, -18.0, 0.010)
            + wave(0.60, 16.0, 0.040)
    }

    fn next_packet(&mut self, rng: &mut StdRng) -> DevicePacket {
        let t0 = self.t;
        let ecg_list = (0..ECG_RATE_HZ)
            .map(|i| {
                let t = t0 + i as f64 / ECG_RATE_HZ as f64;
                (MEDIAN + self.ecg_at(t) + rng.gen_range(-1.5..1.5)).round()
            })
            .collect();
        let breath = |i: usize, shift: f64| {
            let t = t0 + i as f64 / RESP_RATE_HZ as f64;
            (MEDIAN + 50.0 * (2.0 * PI * self.breath_rate_hz * t + shift).sin()).round()
        };
        let resp_list = (0..RESP_RATE_HZ).map(|i| breath(i, 0.0)).collect();
        let abdominal_list = (0..RESP_RATE_HZ).map(|i| breath(i, 0.6)).collect();
        self.t += PACKET_PERIOD.as_secs_f64();
        DevicePacket {
            device_id: self.id.clone(),
            ecg_list,
            resp_list,
            abdominal_list,
        }
    }
}

// 处理一条 GUI 命令，返回 false 表示线程应退出
fn handle_command(
    devices: &mut [SimDevice],
    dropout: &mut bool,
    cmd: GuiCommand,
    tx: &Sender<DeviceMessage>,
) -> bool {
    match cmd {
        GuiCommand::StartStream(id) | GuiCommand::StopStream(id) if !devices.iter().any(|d| d.id == id) => {
            tx.send(DeviceMessage::Log(format!("Unknown device {id}"))).ok();
        }
        GuiCommand::StartStream(id) => {
            if let Some(dev) = devices.iter_mut().find(|d| d.id == id) {
                dev.streaming = true;
            }
            tx.send(DeviceMessage::Streaming(id, true)).ok();
        }
        GuiCommand::StopStream(id) => {
            if let Some(dev) = devices.iter_mut().find(|d| d.id == id) {
                dev.streaming = false;
            }
            tx.send(DeviceMessage::Streaming(id, false)).ok();
        }
        GuiCommand::SetDropout(on) => {
            *dropout = on;
            let state = if on { "interrupted" } else { "restored" };
            tx.send(DeviceMessage::Log(format!("Signal {state}"))).ok();
        }
        GuiCommand::Shutdown => return false,
    }
    true
}

pub fn spawn_thread(device_ids: Vec<String>, tx: Sender<DeviceMessage>, rx_cmd: Receiver<GuiCommand>) {
    thread::spawn(move || {
        tx.send(DeviceMessage::Log(format!("Simulator ready: {} device(s)", device_ids.len()))).ok();

        let mut devices: Vec<SimDevice> = device_ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| SimDevice::new(id, i))
            .collect();
        let mut rng = StdRng::from_entropy();
        let mut dropout = false;
        let mut next_send = Instant::now();

        loop {
            // 1. 消息处理
            for _ in 0..10 {
                let Ok(cmd) = rx_cmd.try_recv() else { break };
                if !handle_command(&mut devices, &mut dropout, cmd, &tx) {
                    return;
                }
            }

            // 2. 定时上报
            let now = Instant::now();
            if now >= next_send {
                next_send += PACKET_PERIOD;
                for dev in devices.iter_mut().filter(|d| d.streaming) {
                    let packet = dev.next_packet(&mut rng);
                    if dropout {
                        continue;
                    }
                    match packet.to_json() {
                        Ok(json) => {
                            if tx.send(DeviceMessage::Payload(json)).is_err() {
                                // GUI 已退出
                                return;
                            }
                        }
                        Err(err) => log::warn!("failed to encode packet: {err}"),
                    }
                }
            }
            thread::sleep(Duration::from_millis(20));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_covers_one_second_per_channel() {
        let mut dev = SimDevice::new("01000341".into(), 0);
        let mut rng = StdRng::seed_from_u64(7);
        let packet = dev.next_packet(&mut rng);
        assert_eq!(packet.ecg_list.len(), 200);
        assert_eq!(packet.resp_list.len(), 25);
        assert_eq!(packet.abdominal_list.len(), 25);
        let peak = packet.ecg_list.iter().cloned().fold(f64::MIN, f64::max);
        assert!(peak > MEDIAN + 40.0, "no R wave in {peak}");
        assert_eq!(dev.t, 1.0);
    }

    #[test]
    fn stop_command_halts_one_device() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut devices = vec![SimDevice::new("a".into(), 0), SimDevice::new("b".into(), 1)];
        let mut dropout = false;
        for id in ["a", "b"] {
            assert!(handle_command(&mut devices, &mut dropout, GuiCommand::StartStream(id.into()), &tx));
        }
        assert!(handle_command(&mut devices, &mut dropout, GuiCommand::StopStream("a".into()), &tx));
        assert!(!devices[0].streaming);
        assert!(devices[1].streaming);
        let last = rx.try_iter().last();
        assert!(matches!(last, Some(DeviceMessage::Streaming(id, false)) if id == "a"));
        assert!(handle_command(&mut devices, &mut dropout, GuiCommand::StopStream("zz".into()), &tx));
        assert!(matches!(rx.try_recv(), Ok(DeviceMessage::Log(_))));
        assert!(!handle_command(&mut devices, &mut dropout, GuiCommand::Shutdown, &tx));
    }
}
