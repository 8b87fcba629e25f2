//! Client application entry point.
//!
//! `client` with no arguments starts in `SinglePlay` (host loopback, zero
//! remote clients). `client <host[:port]>` starts directly in `Client` mode
//! against that address. Either way, the in-game chat box accepts `/single`,
//! `/host [port]`, `/connect <host[:port]>`, `/player <n>` and
//! `/admin enable|disable` to switch roles at runtime.

mod input;
mod net_client;
mod rendering;
mod router;
mod view;

use clap::Parser;
use log::{error, info};
use macroquad::prelude::*;

use input::{ChatBox, InputManager};
use rendering::Renderer;
use router::Router;
use shared::GameMode;
use view::Viewport;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host to connect to as a client, e.g. "127.0.0.1:12345". Omit to start
    /// in single-player.
    server: Option<String>,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Gravity Arena".to_owned(),
        window_width: 1024,
        window_height: 768,
        window_resizable: true,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut router = Router::new();
    if let Some(server) = args.server {
        info!("connecting to {server}");
        router.set_mode(GameMode::Client, Some(server));
    }

    let mut input = InputManager::new();
    let mut chat = ChatBox::new();
    let renderer = Renderer::new();

    loop {
        if is_quit_requested() {
            info!("window closed");
            return;
        }

        router.poll();

        if let Some(fatal) = router.fatal.take() {
            error!("{}", fatal.0);
            std::process::exit(-1);
        }

        let viewport = Viewport::fit(screen_width(), screen_height());

        if !chat.focused {
            if let Some(event) = input.update(&viewport) {
                router.handle_window(event);
            }
        } else {
            let _ = input.update(&viewport);
        }

        if let Some(line) = chat.update() {
            router.handle_chat(line);
        }

        let status = format!("mode: {:?} | player {}", router.mode(), router.local_player_id());
        renderer.render(
            &viewport,
            &router.render_objects,
            router.local_player_id(),
            input.drag_preview(&viewport),
            input.mouse_radius,
            &router.chat_log,
            chat.focused.then_some(chat.text.as_str()),
            &router.scores,
            &status,
        );

        next_frame().await;
    }
}
