#![forbid(unsafe_code)]

//! Two-device smart-home panel used by the autopilot demo and the tests.
//!
//! Layout on an 800x480 viewport:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │        ┌──────────── card ────────────┐      │
//! │        │  [ power ]   [ - ]  [ + ]     │      │
//! │        └───────────────────────────────┘      │
//! │ [prev]     ┌── recommendation ──[accept]┐ [next]
//! └──────────────────────────────────────────────┘
//! ```
//!
//! One card per device, one card shown per page. The recommendation banner
//! starts hidden; [`SmartHome::show_recommendation`] reveals it.

use std::cell::RefCell;
use std::rc::Rc;

use web_time::Duration;

use gaze_core::geometry::Rect;
use gaze_runtime::autopilot::{Locator, Script};
use gaze_runtime::registry::{DwellProfile, GazeTarget, TargetError};
use gaze_runtime::root::InteractionRoot;
use gaze_runtime::scene::{ElementId, Scene};

/// The element tree every harness scenario runs on.
pub type SharedScene = Rc<RefCell<Scene>>;

pub const CARD: Rect = Rect::new(160.0, 60.0, 480.0, 300.0);
pub const POWER: Rect = Rect::new(200.0, 100.0, 180.0, 120.0);
pub const MINUS: Rect = Rect::new(420.0, 100.0, 90.0, 120.0);
pub const PLUS: Rect = Rect::new(520.0, 100.0, 90.0, 120.0);
pub const PREV: Rect = Rect::new(20.0, 400.0, 120.0, 60.0);
pub const NEXT: Rect = Rect::new(660.0, 400.0, 120.0, 60.0);
pub const BANNER: Rect = Rect::new(180.0, 375.0, 440.0, 90.0);
pub const ACCEPT: Rect = Rect::new(480.0, 385.0, 120.0, 70.0);

/// Observable state of one device.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Device {
    pub name: String,
    pub on: bool,
    pub level: u8,
}

impl Device {
    pub const MAX_LEVEL: u8 = 10;

    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            on: false,
            level: 5,
        }
    }
}

/// Everything a target callback can change.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct HomeState {
    pub devices: Vec<Device>,
    pub page: usize,
    pub recommendation_shown: bool,
    pub recommendations_accepted: u32,
    /// Callback log in firing order.
    pub log: Vec<String>,
}

/// Element ids of the fixture.
#[derive(Debug, Clone)]
pub struct HomeIds {
    pub page: ElementId,
    pub cards: Vec<ElementId>,
    pub power: Vec<ElementId>,
    pub minus: Vec<ElementId>,
    pub plus: Vec<ElementId>,
    pub prev: ElementId,
    pub next: ElementId,
    pub banner: ElementId,
    pub accept: ElementId,
}

/// Scene, state, and element ids for the smart-home panel.
#[derive(Debug, Clone)]
pub struct SmartHome {
    scene: SharedScene,
    state: Rc<RefCell<HomeState>>,
    ids: HomeIds,
}

impl SmartHome {
    /// Build the panel with the given device names (one page each).
    #[must_use]
    pub fn new(names: &[&str]) -> Self {
        let mut scene = Scene::new();
        let page = scene.add("page", Rect::from_size(800.0, 480.0));

        let mut cards = Vec::new();
        let mut power = Vec::new();
        let mut minus = Vec::new();
        let mut plus = Vec::new();
        for i in 0..names.len() {
            let card = add(&mut scene, page, format!("card-{i}"), CARD, false);
            scene.set_visible(card, i == 0);
            power.push(add(&mut scene, card, format!("power-{i}"), POWER, true));
            minus.push(add(&mut scene, card, format!("minus-{i}"), MINUS, true));
            plus.push(add(&mut scene, card, format!("plus-{i}"), PLUS, true));
            cards.push(card);
        }

        let prev = add(&mut scene, page, "nav-prev".into(), PREV, true);
        let next = add(&mut scene, page, "nav-next".into(), NEXT, true);
        let banner = add(&mut scene, page, "recommendation".into(), BANNER, false);
        let accept = add(&mut scene, banner, "recommendation-accept".into(), ACCEPT, true);
        scene.set_visible(banner, false);

        let state = HomeState {
            devices: names.iter().map(|n| Device::new(n)).collect(),
            page: 0,
            recommendation_shown: false,
            recommendations_accepted: 0,
            log: Vec::new(),
        };

        Self {
            scene: scene.into_shared(),
            state: Rc::new(RefCell::new(state)),
            ids: HomeIds {
                page,
                cards,
                power,
                minus,
                plus,
                prev,
                next,
                banner,
                accept,
            },
        }
    }

    /// The default two-device panel.
    #[must_use]
    pub fn demo() -> Self {
        Self::new(&["Living room lamp", "Thermostat"])
    }

    /// A handle to the shared scene, suitable as the engine's tree.
    pub fn tree(&self) -> SharedScene {
        Rc::clone(&self.scene)
    }

    pub fn ids(&self) -> &HomeIds {
        &self.ids
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> HomeState {
        self.state.borrow().clone()
    }

    /// Register a target for every control of the panel.
    pub fn attach_all(&self, root: &mut InteractionRoot<SharedScene>) {
        for (device, id) in self.ids.power.iter().enumerate() {
            root.attach(*id, PowerToggle::new(self, device));
        }
        for (device, id) in self.ids.minus.iter().enumerate() {
            root.attach(*id, LevelStepper::new(self, device, -1));
        }
        for (device, id) in self.ids.plus.iter().enumerate() {
            root.attach(*id, LevelStepper::new(self, device, 1));
        }
        root.attach(self.ids.prev, PageButton::new(self, -1));
        root.attach(self.ids.next, PageButton::new(self, 1));
        root.attach(self.ids.accept, RecommendationAccept { home: self.clone() });
    }

    /// Reveal the recommendation banner.
    pub fn show_recommendation(&self) {
        self.scene.borrow_mut().set_visible(self.ids.banner, true);
        let mut state = self.state.borrow_mut();
        state.recommendation_shown = true;
        state.log.push("recommendation shown".into());
    }

    /// The guided demo: page forward, switch the device on, leave it on for
    /// ten seconds, switch it off, then wait for a recommendation and accept
    /// it.
    #[must_use]
    pub fn demo_script(&self) -> Script<SharedScene> {
        let last = self.ids.cards.len().saturating_sub(1);
        let power = self.ids.power.get(last).copied();

        let mut script = Script::new();
        if last > 0 {
            script = script
                .dwell_on(Locator::Element(self.ids.next))
                .wait_for("last page shown", move |s: &SharedScene| {
                    s.borrow().find_visible(&format!("card-{last}")).is_some()
                });
        }
        if let Some(power) = power {
            let on = Rc::clone(&self.state);
            script = script
                .dwell_on(Locator::Element(power))
                .wait_for("device on", move |_: &SharedScene| {
                    on.borrow().devices.get(last).is_some_and(|d| d.on)
                })
                .pause(Duration::from_secs(10))
                .dwell_on(Locator::Element(power));
        }
        script.await_recommendation(|s: &SharedScene| {
            s.borrow().find_visible("recommendation-accept")
        })
    }

    fn log(&self, entry: String) {
        self.state.borrow_mut().log.push(entry);
    }

    fn show_page(&self, page: usize) {
        let mut scene = self.scene.borrow_mut();
        for (i, card) in self.ids.cards.iter().enumerate() {
            scene.set_visible(*card, i == page);
        }
    }
}

fn add(scene: &mut Scene, parent: ElementId, label: String, bounds: Rect, control: bool) -> ElementId {
    // Parents are created before their children, so the lookup cannot miss.
    let id = match scene.add_child(parent, label.clone(), bounds) {
        Some(id) => id,
        None => scene.add(label, bounds),
    };
    scene.set_actionable(id, control);
    id
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// Switches one device on or off.
#[derive(Debug)]
pub struct PowerToggle {
    home: SmartHome,
    device: usize,
}

impl PowerToggle {
    fn new(home: &SmartHome, device: usize) -> Self {
        Self {
            home: home.clone(),
            device,
        }
    }
}

impl GazeTarget for PowerToggle {
    fn on_enter(&mut self) -> Result<(), TargetError> {
        self.home.log(format!("enter power-{}", self.device));
        Ok(())
    }

    fn on_leave(&mut self) -> Result<(), TargetError> {
        self.home.log(format!("leave power-{}", self.device));
        Ok(())
    }

    fn on_activate(&mut self) -> Result<(), TargetError> {
        let mut state = self.home.state.borrow_mut();
        let device = state
            .devices
            .get_mut(self.device)
            .ok_or_else(|| TargetError::failed(format!("no device {}", self.device)))?;
        device.on = !device.on;
        let entry = format!(
            "{} {}",
            device.name,
            if device.on { "on" } else { "off" }
        );
        state.log.push(entry);
        Ok(())
    }
}

/// Moves between device pages. Disabled at either end.
#[derive(Debug)]
pub struct PageButton {
    home: SmartHome,
    delta: isize,
}

impl PageButton {
    fn new(home: &SmartHome, delta: isize) -> Self {
        Self {
            home: home.clone(),
            delta,
        }
    }

    fn target_page(&self) -> Option<usize> {
        let state = self.home.state.borrow();
        let page = state.page.checked_add_signed(self.delta)?;
        (page < state.devices.len()).then_some(page)
    }
}

impl GazeTarget for PageButton {
    fn is_enabled(&self) -> bool {
        self.target_page().is_some()
    }

    fn on_activate(&mut self) -> Result<(), TargetError> {
        let page = self
            .target_page()
            .ok_or_else(|| TargetError::failed("no page in that direction"))?;
        {
            let mut state = self.home.state.borrow_mut();
            state.page = page;
            state.log.push(format!("page {page}"));
        }
        self.home.show_page(page);
        Ok(())
    }
}

/// Steps a device level by `delta`. Needs the device on and room to move.
#[derive(Debug)]
pub struct LevelStepper {
    home: SmartHome,
    device: usize,
    delta: i8,
}

impl LevelStepper {
    fn new(home: &SmartHome, device: usize, delta: i8) -> Self {
        Self {
            home: home.clone(),
            device,
            delta,
        }
    }

    fn next_level(&self) -> Option<u8> {
        let state = self.home.state.borrow();
        let device = state.devices.get(self.device).filter(|d| d.on)?;
        let level = device.level.checked_add_signed(self.delta)?;
        (level <= Device::MAX_LEVEL).then_some(level)
    }
}

impl GazeTarget for LevelStepper {
    fn dwell_profile(&self) -> DwellProfile {
        DwellProfile::Coarse
    }

    fn is_enabled(&self) -> bool {
        self.next_level().is_some()
    }

    fn on_activate(&mut self) -> Result<(), TargetError> {
        let level = self
            .next_level()
            .ok_or_else(|| TargetError::failed("level out of range"))?;
        let mut state = self.home.state.borrow_mut();
        if let Some(device) = state.devices.get_mut(self.device) {
            device.level = level;
        }
        state.log.push(format!("device {} level {level}", self.device));
        Ok(())
    }
}

/// Accepts the recommendation and hides the banner.
#[derive(Debug)]
pub struct RecommendationAccept {
    home: SmartHome,
}

impl GazeTarget for RecommendationAccept {
    fn on_activate(&mut self) -> Result<(), TargetError> {
        self.home
            .scene
            .borrow_mut()
            .set_visible(self.home.ids.banner, false);
        let mut state = self.home.state.borrow_mut();
        state.recommendation_shown = false;
        state.recommendations_accepted += 1;
        state.log.push("recommendation accepted".into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaze_runtime::engine::GazeEngine;
    use gaze_runtime::config::EngineConfig;
    use gaze_runtime::scene::ElementTree;
    use web_time::Instant;

    #[test]
    fn only_the_first_card_starts_visible() {
        let home = SmartHome::demo();
        let scene = home.tree();
        let scene = scene.borrow();
        assert!(scene.is_shown(home.ids().power[0]));
        assert!(!scene.is_shown(home.ids().power[1]));
        assert!(!scene.is_shown(home.ids().accept));
    }

    #[test]
    fn hit_testing_routes_to_controls() {
        let home = SmartHome::demo();
        let tree = home.tree();
        assert_eq!(tree.element_at(POWER.center()), Some(home.ids().power[0]));
        assert_eq!(tree.element_at(NEXT.center()), Some(home.ids().next));
        // The hidden accept button is not hittable; the page is.
        assert_eq!(tree.element_at(ACCEPT.center()), Some(home.ids().page));
        home.show_recommendation();
        assert_eq!(tree.element_at(ACCEPT.center()), Some(home.ids().accept));
    }

    #[test]
    fn targets_update_state() {
        let home = SmartHome::demo();
        let t0 = Instant::now();
        let mut root = InteractionRoot::new(EngineConfig::default(), home.tree(), t0);
        home.attach_all(&mut root);

        let mut next = PageButton::new(&home, 1);
        let prev = PageButton::new(&home, -1);
        assert!(!prev.is_enabled());
        next.on_activate().unwrap();
        assert_eq!(home.state().page, 1);
        assert!(!next.is_enabled());
        assert!(home.tree().borrow().is_shown(home.ids().power[1]));
        assert!(!home.tree().borrow().is_shown(home.ids().power[0]));

        let mut plus = LevelStepper::new(&home, 1, 1);
        assert!(!plus.is_enabled(), "device is off");
        PowerToggle::new(&home, 1).on_activate().unwrap();
        assert!(plus.is_enabled());
        plus.on_activate().unwrap();
        assert_eq!(home.state().devices[1].level, 6);
        assert_eq!(plus.dwell_profile(), DwellProfile::Coarse);

        drop(root);
    }

    #[test]
    fn stepper_stops_at_the_bounds() {
        let home = SmartHome::demo();
        PowerToggle::new(&home, 0).on_activate().unwrap();
        let mut plus = LevelStepper::new(&home, 0, 1);
        while plus.is_enabled() {
            plus.on_activate().unwrap();
        }
        assert_eq!(home.state().devices[0].level, Device::MAX_LEVEL);
        assert!(plus.on_activate().is_err());
    }

    #[test]
    fn accepting_hides_the_banner() {
        let home = SmartHome::demo();
        home.show_recommendation();
        RecommendationAccept { home: home.clone() }.on_activate().unwrap();
        let state = home.state();
        assert!(!state.recommendation_shown);
        assert_eq!(state.recommendations_accepted, 1);
        assert_eq!(home.tree().borrow().find_visible("recommendation-accept"), None);
    }

    #[test]
    fn engine_accepts_the_shared_scene() {
        let home = SmartHome::demo();
        let mut engine = GazeEngine::new(EngineConfig::default(), home.tree(), Instant::now());
        engine.attach(home.ids().next, PageButton::new(&home, 1));
        assert_eq!(engine.registry().len(), 1);
    }
}
