use std::sync::Arc;
use std::time::Duration;

use iced::keyboard::{self, Event as KeyboardEvent, Key, key::Named};
use iced::widget::{button, column, container, row, slider, text, toggler};
use iced::{Element, Subscription, Task, Theme, time};
use lucent_core::{
    BrightnessController, Config, ControllerError, DisplayState, FileSettingsGateway, UiScale,
};

/// How often confirmed settings are pulled into the window.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Keyboard step on the UI scale.
const KEY_STEP: i32 = 10;

pub fn main() -> iced::Result {
    env_logger::init();

    iced::application(LucentApp::default, LucentApp::update, LucentApp::view)
        .title("Lucent - Screen Brightness")
        .subscription(LucentApp::subscription)
        .theme(LucentApp::theme)
        .run()
}

struct LucentApp {
    controller: Option<BrightnessController<FileSettingsGateway>>,
    status: Option<String>,
    scale: UiScale,

    // Last confirmed settings
    display: DisplayState,
}

#[derive(Debug, Clone)]
enum Message {
    // Intents
    SliderChanged(i32),
    AutomaticToggled(bool),
    Revert,
    Step(i32),

    // Drain change notifications
    Poll,

    // Keyboard event
    KeyboardEvent(KeyboardEvent),
}

impl Default for LucentApp {
    fn default() -> Self {
        let mut app = Self {
            controller: None,
            status: None,
            scale: UiScale::default(),
            display: DisplayState::default(),
        };

        let config = match Config::load_default() {
            Ok(config) => config,
            Err(e) => {
                app.status = Some(format!("Config error: {}, using defaults", e));
                Config::default()
            }
        };

        let gateway = Arc::new(FileSettingsGateway::from_config(&config.settings));
        match BrightnessController::with_limits(gateway, config.range, config.scale) {
            Ok(controller) => {
                app.scale = controller.scale();
                app.display = controller.display();
                app.controller = Some(controller);
            }
            Err(e) => {
                app.status = Some(format!("Failed to initialize: {}", e));
            }
        }

        app
    }
}

impl LucentApp {
    fn update(&mut self, message: Message) -> Task<Message> {
        if let Message::KeyboardEvent(event) = message {
            return match shortcut(event) {
                Some(message) => self.update(message),
                None => Task::none(),
            };
        }

        let Some(controller) = self.controller.as_mut() else {
            return Task::none();
        };

        let result = match message {
            Message::SliderChanged(value) => controller.set_level_from_ui(value.max(0) as u32),

            Message::AutomaticToggled(enabled) => controller.set_automatic(enabled),

            Message::Revert => controller.revert(),

            Message::Step(delta) => {
                let current = self.scale.to_ui(self.display.level) as i32;
                let target = (current + delta).clamp(0, self.scale.ui_max as i32);
                controller.set_level_from_ui(target as u32)
            }

            Message::Poll => {
                if let Some(display) = controller.process_notifications() {
                    self.display = display;
                }
                return Task::none();
            }

            Message::KeyboardEvent(_) => return Task::none(),
        };

        self.status = match result {
            Ok(()) => None,
            Err(ControllerError::PermissionDenied) => {
                Some("Please enable write permissions, then try again".to_string())
            }
            Err(e) => Some(format!("Error: {}", e)),
        };

        Task::none()
    }

    fn view(&self) -> Element<'_, Message> {
        let title = text("Screen Brightness").size(24);

        let status = text(self.status.as_deref().unwrap_or("")).size(14);

        let ui_value = self.scale.to_ui(self.display.level) as i32;
        let brightness_section = column![
            text(format!(
                "Brightness: {}% (level {})",
                ui_value, self.display.level
            ))
            .size(16),
            slider(
                0..=self.scale.ui_max as i32,
                ui_value,
                Message::SliderChanged
            )
            .step(1),
        ]
        .spacing(5);

        let automatic_toggle = toggler(self.display.is_automatic())
            .label("Automatic brightness")
            .on_toggle(Message::AutomaticToggled);

        let snapshot_hint = match &self.controller {
            Some(controller) => {
                let snapshot = controller.snapshot();
                text(format!(
                    "Session start: level {} ({})",
                    snapshot.level(),
                    snapshot.mode()
                ))
                .size(12)
            }
            None => text("").size(12),
        };

        let revert_button = button("Revert").on_press(Message::Revert);

        let shortcuts_hint =
            text("Shortcuts: Ctrl+Up / Ctrl+Down (brightness) | Ctrl+R (revert)").size(12);

        let content = column![
            title,
            status,
            brightness_section,
            automatic_toggle,
            row![revert_button, snapshot_hint].spacing(10),
            shortcuts_hint,
        ]
        .spacing(15)
        .padding(20);

        container(content).into()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            keyboard::listen().map(Message::KeyboardEvent),
            time::every(POLL_INTERVAL).map(|_| Message::Poll),
        ])
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn shortcut(event: KeyboardEvent) -> Option<Message> {
    let KeyboardEvent::KeyPressed { key, modifiers, .. } = event else {
        return None;
    };

    if !modifiers.control() {
        return None;
    }

    match key.as_ref() {
        Key::Named(Named::ArrowUp) => Some(Message::Step(KEY_STEP)),
        Key::Named(Named::ArrowDown) => Some(Message::Step(-KEY_STEP)),
        Key::Character(c) if c == "r" => Some(Message::Revert),
        _ => None,
    }
}
