//! Fair Toss entry point
//!
//! On the web: creates the WebGPU surface, wires the roll buttons and drives
//! the session from requestAnimationFrame. Natively: runs headless tosses and
//! prints the tallies.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlCanvasElement, HtmlInputElement};

    use fair_toss::consts::MAX_BODIES;
    use fair_toss::history::{format_record, format_time};
    use fair_toss::renderer::SdfRenderState;
    use fair_toss::sim::{CancelToken, ObjectKind, RollAck, SessionEvent, SimulationSession};
    use fair_toss::{EngineConfig, HistoryLedger, Settings};

    /// App instance holding the session and UI-side state
    struct App {
        session: SimulationSession<SdfRenderState>,
        history: HistoryLedger,
        settings: Settings,
        canvas: HtmlCanvasElement,
        document: Document,
    }

    impl App {
        /// Canvas size in physical pixels
        fn canvas_size(&self) -> (u32, u32) {
            let dpr = web_sys::window().map_or(1.0, |w| w.device_pixel_ratio());
            let w = (self.canvas.client_width().max(0) as f64 * dpr) as u32;
            let h = (self.canvas.client_height().max(0) as f64 * dpr) as u32;
            (w, h)
        }

        fn dice_count(&self) -> usize {
            self.document
                .get_element_by_id("dice-count")
                .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
                .and_then(|input| input.value().parse::<usize>().ok())
                .unwrap_or(1)
                .clamp(1, MAX_BODIES)
        }

        /// Consume session events and refresh the result panel
        fn handle_events(&mut self) {
            for event in self.session.drain_events() {
                match event {
                    SessionEvent::Settled(record) => {
                        self.set_text("result-value", &format_record(&record));
                        self.set_text("result-status", if record.forced { "Best guess" } else { "Settled" });
                        self.history.record_roll(record);
                        self.history.save();
                        self.update_history();
                    }
                    SessionEvent::Launched { .. } => {
                        self.set_text("result-status", "Rolling...");
                    }
                    SessionEvent::Anomaly { body_id, kind } => {
                        log::debug!("Body {} anomaly: {:?}", body_id, kind);
                    }
                }
            }
        }

        /// Rolling display while in flight
        fn update_preview(&self) {
            if !self.settings.live_preview {
                return;
            }
            if let Some(preview) = self.session.preview() {
                let labels: Vec<String> = preview.iter().map(|o| o.label()).collect();
                self.set_text("result-value", &labels.join(" "));
            }
        }

        fn update_history(&self) {
            let Some(list) = self.document.get_element_by_id("history-list") else {
                return;
            };
            let items: String = self
                .history
                .entries
                .iter()
                .map(|r| {
                    format!(
                        "<li><span class=\"roll\">{}</span><span class=\"when\">{}</span></li>",
                        format_record(r),
                        format_time(r.timestamp)
                    )
                })
                .collect();
            list.set_inner_html(&items);

            let tallies: Vec<String> = self
                .history
                .tallies
                .iter()
                .map(|(label, count)| format!("{}: {}", label, count))
                .collect();
            self.set_text("tallies", &tallies.join("  "));
        }

        fn set_text(&self, id: &str, text: &str) {
            if let Some(el) = self.document.get_element_by_id(id) {
                el.set_text_content(Some(text));
            }
        }

        fn roll(&mut self, kind: ObjectKind, count: usize) {
            match self.session.roll(kind, count) {
                RollAck::Accepted => {}
                RollAck::RejectedInFlight => log::debug!("Roll ignored, toss in flight"),
                RollAck::Inactive => log::debug!("Roll ignored, session not live"),
            }
        }
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        log::info!("Fair Toss starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;

        let dpr = window.device_pixel_ratio();
        let width = (canvas.client_width().max(0) as f64 * dpr) as u32;
        let height = (canvas.client_height().max(0) as f64 * dpr) as u32;
        canvas.set_width(width.max(1));
        canvas.set_height(height.max(1));

        let settings = Settings::load();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });
        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let render_state = SdfRenderState::new(surface, &adapter, width, height, settings.quality)
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        let seed = js_sys::Date::now() as u64;
        let mut session = SimulationSession::new(render_state, EngineConfig::default(), seed);
        session.apply_settings(&settings);
        log::info!("Session created with seed: {}", seed);

        let mut history = HistoryLedger::load();
        history.set_capacity(settings.history_size);

        let app = Rc::new(RefCell::new(App {
            session,
            history,
            settings,
            canvas: canvas.clone(),
            document: document.clone(),
        }));
        app.borrow().update_history();

        setup_buttons(&document, app.clone());
        setup_resize(app.clone());
        setup_keyboard(app.clone());
        setup_teardown(app.clone());

        try_init(&app);
        Ok(())
    }

    /// Init the session if the canvas has a size; start the frame loop once live
    fn try_init(app: &Rc<RefCell<App>>) {
        let token = {
            let mut a = app.borrow_mut();
            let was_live = a.session.is_live();
            let (w, h) = a.canvas_size();
            if w > 0 && h > 0 {
                a.canvas.set_width(w);
                a.canvas.set_height(h);
            }
            match a.session.init(w, h) {
                Ok(()) if !was_live && a.session.is_live() => a.session.frame_token(),
                Ok(()) => None,
                Err(e) => {
                    log::debug!("{}, waiting for layout", e);
                    None
                }
            }
        };
        if let Some(token) = token {
            let kind = ObjectKind::Die;
            let count = app.borrow().dice_count();
            app.borrow_mut().session.create_objects(count, kind);
            request_animation_frame(app.clone(), token);
            log::info!("Fair Toss running!");
        }
    }

    fn setup_buttons(document: &Document, app: Rc<RefCell<App>>) {
        if let Some(btn) = document.get_element_by_id("roll-dice") {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut a = app.borrow_mut();
                let count = a.dice_count();
                a.roll(ObjectKind::Die, count);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("flip-coin") {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                app.borrow_mut().roll(ObjectKind::Coin, 1);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Changing the count rebuilds the dice right away
        if let Some(input) = document.get_element_by_id("dice-count") {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let mut a = app.borrow_mut();
                let count = a.dice_count();
                a.session.create_objects(count, ObjectKind::Die);
            });
            let _ = input.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("clear-history") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut a = app.borrow_mut();
                a.history.reset();
                a.history.save();
                a.update_history();
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_resize(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let live = app.borrow().session.is_live();
            if !live {
                try_init(&app);
                return;
            }
            let mut a = app.borrow_mut();
            let (w, h) = a.canvas_size();
            if w > 0 && h > 0 {
                a.canvas.set_width(w);
                a.canvas.set_height(h);
            }
            if let Err(e) = a.session.resize(w, h) {
                log::debug!("resize skipped: {}", e);
            }
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_keyboard(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
            let mut a = app.borrow_mut();
            match event.key().as_str() {
                " " | "Enter" => {
                    let count = a.dice_count();
                    a.roll(ObjectKind::Die, count);
                }
                "c" | "C" => a.roll(ObjectKind::Coin, 1),
                _ => {}
            }
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    /// Tear down on page hide; queued frames see the cancelled token
    fn setup_teardown(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let mut a = app.borrow_mut();
            a.history.save();
            a.settings.save();
            a.session.dispose();
        });
        let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(app: Rc<RefCell<App>>, token: CancelToken) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |_time: f64| {
            frame_loop(app, token);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn frame_loop(app: Rc<RefCell<App>>, token: CancelToken) {
        if token.is_cancelled() {
            return;
        }
        {
            let mut a = app.borrow_mut();
            // wall clock so history timestamps are absolute
            a.session.on_frame(js_sys::Date::now());
            a.handle_events();
            a.update_preview();
        }
        request_animation_frame(app, token);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() -> Result<(), JsValue> {
    wasm_app::run().await
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use fair_toss::history::format_record;
    use fair_toss::renderer::HeadlessSurface;
    use fair_toss::sim::{ObjectKind, RollAck, SessionEvent, SimulationSession};
    use fair_toss::{EngineConfig, HistoryLedger};

    env_logger::init();
    log::info!("Fair Toss (native) starting...");
    log::info!("Native mode runs headless; use `trunk serve` for the web version");

    // fair-toss [die|coin] [count] [tosses] [seed]
    let args: Vec<String> = std::env::args().skip(1).collect();
    let kind = args
        .first()
        .and_then(|s| ObjectKind::from_str(s))
        .unwrap_or(ObjectKind::Die);
    let count = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(1);
    let tosses: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(60);
    let seed = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(42);

    let mut session = SimulationSession::new(HeadlessSurface::new(), EngineConfig::default(), seed);
    if let Err(e) = session.init(640, 480) {
        log::error!("{}", e);
        return;
    }
    let mut history = HistoryLedger::with_capacity(tosses.max(1));

    let frame_ms = 1000.0 / 60.0;
    let mut now = 0.0;
    for i in 0..tosses {
        if session.roll(kind, count) != RollAck::Accepted {
            log::error!("Toss {} was not accepted", i + 1);
            break;
        }
        let mut settled = None;
        // settle timeout bounds this loop
        while settled.is_none() {
            now += frame_ms;
            session.on_frame(now);
            for event in session.drain_events() {
                if let SessionEvent::Settled(record) = event {
                    settled = Some(record);
                }
            }
        }
        if let Some(record) = settled {
            println!("{:>4}: {}", i + 1, format_record(&record));
            history.record_roll(record);
        }
    }

    println!("\nTallies over {} tosses:", history.total_rolls);
    for (label, n) in &history.tallies {
        println!("  {:>5}: {}", label, n);
    }
    session.dispose();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
