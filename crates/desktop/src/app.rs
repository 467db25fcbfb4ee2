use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use iced::widget::{button, column, container, image, text};
use iced::{window, Element, Length, Subscription, Task};

use agegender_core::shared::constants::{NO_FACE_TEXT, WINDOW_TITLE, WINDOW_SUBTITLE};

use crate::settings::Settings;
use crate::workers::camera_worker::{self, WorkerMessage, WorkerParams};

/// How often the UI drains the worker channel.
const POLL_INTERVAL: Duration = Duration::from_millis(30);

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    Stop,
    CloseRequested(window::Id),
}

#[derive(Debug, Clone, PartialEq)]
enum Status {
    Downloading {
        file: String,
        downloaded: u64,
        total: u64,
    },
    Starting,
    Running {
        labels: bool,
    },
    Stopping,
    Stopped(String),
    Failed(String),
}

impl Status {
    fn describe(&self) -> String {
        match self {
            Status::Downloading {
                file,
                downloaded,
                total,
            } if *total > 0 => {
                let pct = (*downloaded as f64 / *total as f64 * 100.0) as u32;
                format!("Downloading {file}... {pct}%")
            }
            Status::Downloading {
                file, downloaded, ..
            } => format!("Downloading {file}... {downloaded} bytes"),
            Status::Starting => "Loading models and opening camera...".into(),
            Status::Running { labels: true } => "Camera running".into(),
            Status::Running { labels: false } => {
                "Camera running (no label font found; showing boxes only)".into()
            }
            Status::Stopping => "Stopping...".into(),
            Status::Stopped(summary) => summary.clone(),
            Status::Failed(e) => format!("Error: {e}"),
        }
    }
}

struct Worker {
    rx: Receiver<WorkerMessage>,
    stop: Arc<AtomicBool>,
}

pub struct App {
    worker: Option<Worker>,
    frame: Option<image::Handle>,
    detection: String,
    status: Status,
    closing: bool,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let mut app = Self {
            worker: None,
            frame: None,
            detection: NO_FACE_TEXT.to_string(),
            status: Status::Starting,
            closing: false,
        };

        match Settings::load().resolve() {
            Ok(config) => {
                let (rx, stop) = camera_worker::spawn(WorkerParams { config });
                app.worker = Some(Worker { rx, stop });
            }
            Err(e) => {
                log::error!("Invalid configuration: {e}");
                app.status = Status::Failed(e.to_string());
            }
        }

        (app, Task::none())
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => return self.drain_worker(),
            Message::Stop => self.request_stop(),
            Message::CloseRequested(_) => {
                self.closing = true;
                if self.worker.is_none() {
                    return iced::exit();
                }
                self.request_stop();
            }
        }
        Task::none()
    }

    fn request_stop(&mut self) {
        if let Some(worker) = &self.worker {
            worker.stop.store(true, Ordering::Relaxed);
            self.status = Status::Stopping;
        }
    }

    fn drain_worker(&mut self) -> Task<Message> {
        let Some(worker) = &self.worker else {
            return Task::none();
        };
        let messages: Vec<WorkerMessage> = worker.rx.try_iter().collect();

        let mut finished = false;
        for message in messages {
            match message {
                WorkerMessage::DownloadProgress {
                    file,
                    downloaded,
                    total,
                } => {
                    self.status = Status::Downloading {
                        file,
                        downloaded,
                        total,
                    };
                }
                WorkerMessage::Running { labels } => {
                    if self.status != Status::Stopping {
                        self.status = Status::Running { labels };
                    }
                }
                WorkerMessage::Frame(update) => {
                    self.frame = Some(image::Handle::from_rgba(
                        update.width,
                        update.height,
                        update.rgba,
                    ));
                    self.detection = update.text;
                }
                WorkerMessage::Stopped(summary) => {
                    log::info!("{summary}");
                    self.status = Status::Stopped(summary);
                    finished = true;
                }
                WorkerMessage::Error(e) => {
                    log::error!("{e}");
                    self.status = Status::Failed(e);
                    finished = true;
                }
            }
        }

        if finished {
            self.worker = None;
            if self.closing {
                return iced::exit();
            }
        }
        Task::none()
    }

    pub fn view(&self) -> Element<'_, Message> {
        let title = text(WINDOW_TITLE).size(22);
        let subtitle = text(WINDOW_SUBTITLE).size(14);

        let video: Element<'_, Message> = match &self.frame {
            Some(handle) => image(handle.clone())
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => text("Waiting for camera...").size(14).into(),
        };
        let video_region = container(video)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .style(container::bordered_box);

        let detection = text(self.detection.as_str()).size(18);
        let status = text(self.status.describe()).size(12);

        let stop = button(text("Stop")).padding([6, 18]).style(button::danger);
        let stop = if self.worker.is_some() && self.status != Status::Stopping {
            stop.on_press(Message::Stop)
        } else {
            stop
        };

        column![title, subtitle, video_region, detection, status, stop]
            .spacing(10)
            .padding(16)
            .height(Length::Fill)
            .into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let close = window::close_requests().map(Message::CloseRequested);
        if self.worker.is_some() {
            Subscription::batch([
                close,
                iced::time::every(POLL_INTERVAL).map(|_| Message::Tick),
            ])
        } else {
            close
        }
    }
}
