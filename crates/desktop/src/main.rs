mod app;
mod settings;
mod workers;

use agegender_core::shared::constants::WINDOW_TITLE;
use app::App;

fn main() -> iced::Result {
    env_logger::init();

    iced::application(App::new, App::update, App::view)
        .title(WINDOW_TITLE)
        .subscription(App::subscription)
        .window(iced::window::Settings {
            size: iced::Size::new(720.0, 660.0),
            exit_on_close_request: false,
            ..Default::default()
        })
        .run()
}
