// src/types.rs

// GUI 发给模拟设备线程的命令
#[derive(Clone, Debug)]
pub enum GuiCommand {
    StartStream(String),
    StopStream(String),
    // 模拟信号中断 (用于观察空闲自动暂停)
    SetDropout(bool),
    Shutdown,
}

// 设备线程发给 GUI 的消息
#[derive(Clone, Debug)]
pub enum DeviceMessage {
    Log(String),
    Streaming(String, bool),
    // JSON 数据包，格式同采集器上报
    Payload(String),
}
