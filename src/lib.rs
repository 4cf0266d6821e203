pub mod config;
pub mod error;
pub mod expr;
pub mod json;
pub mod model;
pub mod tes;
pub mod geometry {
    pub mod intersect;
    pub mod limits;
    pub mod math;
    pub mod tolerance;
}
pub mod algorithms {
    pub mod adjacency;
    pub mod anchors;
    pub mod connections;
    pub mod convert;
    pub mod inspect;
    pub mod lazy_map;
    pub mod shape_builder;
    pub mod unmirror;
    pub mod valence;
}

use algorithms::convert::convert;
use algorithms::lazy_map::TilingMap;
use config::EngineConfig;
use error::{ConvertError, LoadError, ParseError, TilingError};
use model::Tiling;
use tes::{AcceptRules, LoadOptions, RuleCollaborator};
use tracing::{info, warn};

pub const STATUS_OK: &str = "OK";

/// Owner of the two tiling slots. `active` is what maps are built from; `preview`
/// follows real-valued slider edits without restarting anything.
#[derive(Clone, Debug)]
pub struct TilingContext {
    active: Tiling,
    preview: Tiling,
    using_preview: bool,
    source: Option<String>,
    config: EngineConfig,
    slider_status: String,
}

impl Default for TilingContext {
    fn default() -> Self { Self::new(EngineConfig::default()) }
}

impl TilingContext {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            active: Tiling::default(),
            preview: Tiling::default(),
            using_preview: false,
            source: None,
            config,
            slider_status: STATUS_OK.to_string(),
        }
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn config_mut(&mut self) -> &mut EngineConfig { &mut self.config }

    pub fn active(&self) -> &Tiling { &self.active }

    pub fn preview(&self) -> &Tiling { &self.preview }

    pub fn using_preview(&self) -> bool { self.using_preview }

    /// Source text of the last successful load; `None` before any load or after a conversion.
    pub fn source(&self) -> Option<&str> { self.source.as_deref() }

    /// "OK", or the message of the last failed slider reparse.
    pub fn slider_status(&self) -> &str { &self.slider_status }

    pub fn current_or_preview(&self) -> &Tiling {
        if self.using_preview { &self.preview } else { &self.active }
    }

    fn next_order(&self) -> u64 { self.active.order.max(self.preview.order) + 1 }

    fn install(&mut self, mut t: Tiling) {
        t.order = self.next_order();
        self.preview = t.clone();
        self.active = t;
        self.using_preview = false;
    }

    /// Load a tiling description. On any error both slots are left as they were.
    pub fn load(&mut self, source: &str) -> Result<(), LoadError> {
        self.load_with_rules(source, &mut AcceptRules)
    }

    pub fn load_with_rules(&mut self, source: &str, rules: &mut dyn RuleCollaborator) -> Result<(), LoadError> {
        let t = tes::load(source, LoadOptions { config: &self.config, prior: None }, rules)?;
        self.install(t);
        self.source = Some(source.to_string());
        self.slider_status = STATUS_OK.to_string();
        Ok(())
    }

    /// Set the value of the named slider (real or integer) in the active tiling.
    /// Takes effect on the next [`sliders_changed`](Self::sliders_changed).
    pub fn set_slider(&mut self, name: &str, value: f64) -> bool {
        if let Some(s) = self.active.sliders.iter_mut().find(|s| s.name == name) {
            s.current = value;
            return true;
        }
        if let Some(s) = self.active.intsliders.iter_mut().find(|s| s.name == name) {
            s.current = (value + 0.5).floor() as i64;
            return true;
        }
        warn!(name, "no such slider");
        false
    }

    /// Reparse the last source with the current slider values. Without `need_restart`
    /// the result goes to the preview slot; with it, the active slot is replaced.
    /// Failures keep both slots and are recorded as the slider status.
    pub fn sliders_changed(&mut self, need_restart: bool) -> Result<(), LoadError> {
        let Some(source) = self.source.clone() else {
            let err = LoadError::Syntax(ParseError { message: "no tiling source loaded".into(), position: Default::default() });
            self.slider_status = err.to_string();
            return Err(err);
        };
        let res = tes::load(&source, LoadOptions { config: &self.config, prior: Some(&self.active) }, &mut AcceptRules);
        match res {
            Ok(mut t) => {
                if need_restart {
                    self.install(t);
                } else {
                    t.order = self.next_order();
                    self.preview = t;
                    self.using_preview = true;
                }
                self.slider_status = STATUS_OK.to_string();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "slider reparse failed");
                self.slider_status = e.to_string();
                Err(e)
            }
        }
    }

    /// Make the preview the active tiling.
    pub fn commit_preview(&mut self) {
        if self.using_preview {
            self.active = self.preview.clone();
            self.using_preview = false;
        }
    }

    pub fn new_map(&self) -> Result<TilingMap, TilingError> {
        TilingMap::new(self.current_or_preview().clone())
    }

    /// Replace the active tiling with the classes of `map`.
    pub fn convert_from(&mut self, map: &mut TilingMap) -> Result<(), ConvertError> {
        let t = convert(map, &self.config)?;
        info!(shapes = t.shapes.len(), "installed converted tiling");
        self.install(t);
        self.source = None;
        Ok(())
    }
}
