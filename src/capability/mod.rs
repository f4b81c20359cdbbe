//! Capability registry.
//!
//! Process-wide singleton dispatching component-specific rendering and CSS
//! generation to registered plugins, and exposing the host API plugins use
//! to reach core services (state updates, dirty marks, logging).
//!
//! The shared-library loader's platform shims are outside this core; a
//! plugin here is a registered trait object whose `initialize` plays the
//! role of the fixed entry symbol. Mutations are not thread-safe by
//! contract; callers serialize (the registry lock enforces it).

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::ir::{Component, ComponentType};

/// API version handed to plugins. A plugin refuses to initialize when the
/// major version does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl ApiVersion {
    pub const CURRENT: ApiVersion = ApiVersion {
        major: 1,
        minor: 0,
        patch: 0,
    };

    pub fn is_compatible(&self, other: &ApiVersion) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Registry faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("capability registry not initialized")]
    NotInitialized,
    #[error("capability registry already initialized")]
    AlreadyInitialized,
    #[error("plugin '{0}' failed to initialize")]
    PluginInitFailed(String),
    #[error("plugin '{0}' is not loaded")]
    UnknownPlugin(String),
    #[error("duplicate {kind} registration for '{target}' (already owned by '{owner}')")]
    DuplicateRegistration {
        kind: &'static str,
        target: String,
        owner: String,
    },
    #[error("plugin API version mismatch: host {host}, plugin wants major {requested}")]
    VersionMismatch { host: ApiVersion, requested: u16 },
}

/// Descriptive metadata a plugin reports on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
}

/// Opaque view into a component's custom data, passed to capabilities.
#[derive(Debug, Clone, Copy)]
pub struct DataHandle<'a> {
    pub data: &'a JsonValue,
    pub component_type: ComponentType,
    pub instance_id: u32,
}

impl<'a> DataHandle<'a> {
    pub fn new(component: &'a Component) -> Option<Self> {
        Some(Self {
            data: component.custom_data.as_ref()?,
            component_type: component.component_type,
            instance_id: component.id,
        })
    }

    pub fn get_string(&self, key: &str) -> Option<&'a str> {
        self.data.get(key)?.as_str()
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.data.get(key)?.as_i64()
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.data.get(key)?.as_f64()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key)?.as_bool()
    }

    pub fn get_value(&self, key: &str) -> Option<&'a JsonValue> {
        self.data.get(key)
    }

    /// The well-known primary payload field for this component type, the
    /// compile-time contract between core and plugins.
    pub fn primary_text(&self) -> Option<&'a str> {
        let key = match self.component_type {
            ComponentType::CodeBlock | ComponentType::CodeInline => "code",
            ComponentType::Markdown => "source",
            ComponentType::Flowchart => "definition",
            ComponentType::EmbedView => "url",
            ComponentType::Canvas => "script",
            _ => return None,
        };
        self.get_string(key)
    }
}

/// Capability function types. Plain function pointers so registrations
/// stay `Send` and the table stays flat.
pub type WebRenderFn = fn(handle: &DataHandle<'_>, theme: &str) -> Option<String>;
pub type CssGenerateFn = fn(theme: &str) -> Option<String>;
pub type ComponentRenderFn = fn(handle: &DataHandle<'_>) -> Option<String>;
pub type CommandHandlerFn = fn(command: &str, args: &JsonValue) -> bool;
pub type EventHandlerFn = fn(event: &str, component_id: u32) -> bool;
/// Property-parser extension: returns true when the property was consumed.
pub type PropertyParserFn = fn(component: &mut Component, name: &str, value: &str) -> bool;

/// A queued state mutation from a plugin, consumed by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    Int { variable: String, value: i64 },
    String { variable: String, value: String },
}

/// A loadable plugin. `initialize` is the entry symbol: it receives the
/// registrar and must check [`ApiVersion::CURRENT`].
pub trait Plugin: Send {
    fn metadata(&self) -> PluginMetadata;

    fn initialize(&mut self, registrar: &mut Registrar<'_>) -> Result<(), CapabilityError>;

    /// Optional unload hook.
    fn unload(&mut self) {}
}

struct Registration<F> {
    owner: String,
    callback: F,
}

#[derive(Default)]
struct RegistryState {
    plugins: Vec<(PluginMetadata, Box<dyn Plugin>)>,
    web_renderers: FxHashMap<ComponentType, Registration<WebRenderFn>>,
    css_generators: FxHashMap<ComponentType, Registration<CssGenerateFn>>,
    component_renderers: FxHashMap<ComponentType, Registration<ComponentRenderFn>>,
    command_handlers: FxHashMap<String, Registration<CommandHandlerFn>>,
    event_handlers: FxHashMap<String, Registration<EventHandlerFn>>,
    property_parsers: FxHashMap<String, Registration<PropertyParserFn>>,
    state_updates: VecDeque<StateUpdate>,
    dirty_marks: VecDeque<u32>,
    /// Last known value per variable, published by the renderer and read
    /// by plugins. Queued updates land here too, so a plugin sees its own
    /// writes before the renderer drains them.
    state_mirror: FxHashMap<String, StateUpdate>,
}

/// Registration facade handed to a plugin during `initialize`. Every
/// registration is tagged with the loading plugin so unload can remove it.
pub struct Registrar<'a> {
    state: &'a mut RegistryState,
    owner: String,
}

impl Registrar<'_> {
    pub fn api_version(&self) -> ApiVersion {
        ApiVersion::CURRENT
    }

    /// Translate a snake_case component name to its numeric type id.
    pub fn get_component_type_id(&self, name: &str) -> Option<u32> {
        ComponentType::from_snake_case(name).map(|t| t.type_id())
    }

    pub fn register_web_renderer(
        &mut self,
        component_type: ComponentType,
        callback: WebRenderFn,
    ) -> Result<(), CapabilityError> {
        register_slot(
            &mut self.state.web_renderers,
            "web renderer",
            component_type,
            component_type.snake_case_name().to_string(),
            &self.owner,
            callback,
        )
    }

    pub fn register_css_generator(
        &mut self,
        component_type: ComponentType,
        callback: CssGenerateFn,
    ) -> Result<(), CapabilityError> {
        register_slot(
            &mut self.state.css_generators,
            "css generator",
            component_type,
            component_type.snake_case_name().to_string(),
            &self.owner,
            callback,
        )
    }

    pub fn register_component_renderer(
        &mut self,
        component_type: ComponentType,
        callback: ComponentRenderFn,
    ) -> Result<(), CapabilityError> {
        register_slot(
            &mut self.state.component_renderers,
            "component renderer",
            component_type,
            component_type.snake_case_name().to_string(),
            &self.owner,
            callback,
        )
    }

    pub fn register_command_handler(
        &mut self,
        command: impl Into<String>,
        callback: CommandHandlerFn,
    ) -> Result<(), CapabilityError> {
        let command = command.into();
        register_slot(
            &mut self.state.command_handlers,
            "command handler",
            command.clone(),
            command,
            &self.owner,
            callback,
        )
    }

    pub fn register_event_handler(
        &mut self,
        event: impl Into<String>,
        callback: EventHandlerFn,
    ) -> Result<(), CapabilityError> {
        let event = event.into();
        register_slot(
            &mut self.state.event_handlers,
            "event handler",
            event.clone(),
            event,
            &self.owner,
            callback,
        )
    }

    /// Extend the AST→IR property dispatch with a parser for `name`.
    pub fn register_property_parser(
        &mut self,
        name: impl Into<String>,
        callback: PropertyParserFn,
    ) -> Result<(), CapabilityError> {
        let name = name.into();
        register_slot(
            &mut self.state.property_parsers,
            "property parser",
            name.clone(),
            name,
            &self.owner,
            callback,
        )
    }

    /// Queue an int state update for the renderer to consume.
    pub fn queue_state_update_int(&mut self, variable: impl Into<String>, value: i64) {
        let variable = variable.into();
        let update = StateUpdate::Int {
            variable: variable.clone(),
            value,
        };
        self.state.state_mirror.insert(variable, update.clone());
        self.state.state_updates.push_back(update);
    }

    /// Queue a string state update for the renderer to consume.
    pub fn queue_state_update_string(
        &mut self,
        variable: impl Into<String>,
        value: impl Into<String>,
    ) {
        let variable = variable.into();
        let update = StateUpdate::String {
            variable: variable.clone(),
            value: value.into(),
        };
        self.state.state_mirror.insert(variable, update.clone());
        self.state.state_updates.push_back(update);
    }

    /// Read the last known int value of a reactive variable.
    pub fn get_state_int(&self, variable: &str) -> Option<i64> {
        match self.state.state_mirror.get(variable) {
            Some(StateUpdate::Int { value, .. }) => Some(*value),
            _ => None,
        }
    }

    /// Read the last known string value of a reactive variable.
    pub fn get_state_string(&self, variable: &str) -> Option<String> {
        match self.state.state_mirror.get(variable) {
            Some(StateUpdate::String { value, .. }) => Some(value.clone()),
            _ => None,
        }
    }

    /// Mark a component dirty.
    pub fn queue_dirty_mark(&mut self, component_id: u32) {
        self.state.dirty_marks.push_back(component_id);
    }

    pub fn log_info(&self, message: &str) {
        tracing::info!(plugin = %self.owner, "{message}");
    }

    pub fn log_warn(&self, message: &str) {
        tracing::warn!(plugin = %self.owner, "{message}");
    }

    pub fn log_error(&self, message: &str) {
        tracing::error!(plugin = %self.owner, "{message}");
    }

    pub fn log_debug(&self, message: &str) {
        tracing::debug!(plugin = %self.owner, "{message}");
    }
}

fn register_slot<K: std::hash::Hash + Eq, F>(
    map: &mut FxHashMap<K, Registration<F>>,
    kind: &'static str,
    key: K,
    target: String,
    owner: &str,
    callback: F,
) -> Result<(), CapabilityError> {
    if let Some(existing) = map.get(&key) {
        return Err(CapabilityError::DuplicateRegistration {
            kind,
            target,
            owner: existing.owner.clone(),
        });
    }
    map.insert(
        key,
        Registration {
            owner: owner.to_string(),
            callback,
        },
    );
    Ok(())
}

// The inner Option tracks the init/shutdown lifecycle; the lock serializes
// plugin load/unload against dispatch.
static REGISTRY: Mutex<Option<RegistryState>> = Mutex::new(None);

fn with_registry<R>(
    f: impl FnOnce(&mut RegistryState) -> R,
) -> Result<R, CapabilityError> {
    let mut guard = REGISTRY.lock();
    match guard.as_mut() {
        Some(state) => Ok(f(state)),
        None => Err(CapabilityError::NotInitialized),
    }
}

/// Initialize the registry. Must run before the first compile that touches
/// plugins.
pub fn init() -> Result<(), CapabilityError> {
    let mut guard = REGISTRY.lock();
    if guard.is_some() {
        return Err(CapabilityError::AlreadyInitialized);
    }
    *guard = Some(RegistryState::default());
    tracing::debug!(version = %ApiVersion::CURRENT, "capability registry initialized");
    Ok(())
}

/// Shut down: unload every plugin (reverse load order) and drop all
/// registrations.
pub fn shutdown() {
    let mut guard = REGISTRY.lock();
    if let Some(mut state) = guard.take() {
        while let Some((metadata, mut plugin)) = state.plugins.pop() {
            tracing::debug!(plugin = %metadata.name, "unloading plugin");
            plugin.unload();
        }
    }
}

pub fn is_initialized() -> bool {
    REGISTRY.lock().is_some()
}

/// Load a plugin: call its entry hook with a registrar; on success record
/// it, on failure discard it and every registration it made.
pub fn load_plugin(mut plugin: Box<dyn Plugin>) -> Result<PluginMetadata, CapabilityError> {
    let metadata = plugin.metadata();
    with_registry(|state| {
        let mut registrar = Registrar {
            state,
            owner: metadata.name.clone(),
        };
        match plugin.initialize(&mut registrar) {
            Ok(()) => {
                tracing::info!(plugin = %metadata.name, version = %metadata.version, "plugin loaded");
                state.plugins.push((metadata.clone(), plugin));
                Ok(metadata.clone())
            }
            Err(e) => {
                remove_registrations(state, &metadata.name);
                tracing::warn!(plugin = %metadata.name, error = %e, "plugin failed to load");
                Err(e)
            }
        }
    })?
}

/// Unload one plugin by name: call the unload hook and remove every
/// registration it owns.
pub fn unload_plugin(name: &str) -> Result<(), CapabilityError> {
    with_registry(|state| {
        let idx = state
            .plugins
            .iter()
            .position(|(m, _)| m.name == name)
            .ok_or_else(|| CapabilityError::UnknownPlugin(name.to_string()))?;
        let (metadata, mut plugin) = state.plugins.remove(idx);
        plugin.unload();
        remove_registrations(state, &metadata.name);
        tracing::info!(plugin = %metadata.name, "plugin unloaded");
        Ok(())
    })?
}

fn remove_registrations(state: &mut RegistryState, owner: &str) {
    state.web_renderers.retain(|_, r| r.owner != owner);
    state.css_generators.retain(|_, r| r.owner != owner);
    state.component_renderers.retain(|_, r| r.owner != owner);
    state.command_handlers.retain(|_, r| r.owner != owner);
    state.event_handlers.retain(|_, r| r.owner != owner);
    state.property_parsers.retain(|_, r| r.owner != owner);
}

/// Metadata of every loaded plugin, in load order.
pub fn loaded_plugins() -> Vec<PluginMetadata> {
    with_registry(|state| state.plugins.iter().map(|(m, _)| m.clone()).collect())
        .unwrap_or_default()
}

/// Dispatch `render_web`. A missing registration yields `None`, not an
/// error.
pub fn render_web(
    component_type: ComponentType,
    handle: &DataHandle<'_>,
    theme: &str,
) -> Option<String> {
    with_registry(|state| {
        state
            .web_renderers
            .get(&component_type)
            .and_then(|r| (r.callback)(handle, theme))
    })
    .ok()
    .flatten()
}

/// Dispatch `generate_css`. Missing registration yields `None`.
pub fn generate_css(component_type: ComponentType, theme: &str) -> Option<String> {
    with_registry(|state| {
        state
            .css_generators
            .get(&component_type)
            .and_then(|r| (r.callback)(theme))
    })
    .ok()
    .flatten()
}

/// Dispatch a component renderer. Missing registration yields `None`.
pub fn render_component(component_type: ComponentType, handle: &DataHandle<'_>) -> Option<String> {
    with_registry(|state| {
        state
            .component_renderers
            .get(&component_type)
            .and_then(|r| (r.callback)(handle))
    })
    .ok()
    .flatten()
}

/// Dispatch a command to its handler. Unknown commands report `false`.
pub fn dispatch_command(command: &str, args: &JsonValue) -> bool {
    with_registry(|state| {
        state
            .command_handlers
            .get(command)
            .map(|r| (r.callback)(command, args))
            .unwrap_or(false)
    })
    .unwrap_or(false)
}

/// Dispatch a named event. Unknown events report `false`.
pub fn dispatch_event(event: &str, component_id: u32) -> bool {
    with_registry(|state| {
        state
            .event_handlers
            .get(event)
            .map(|r| (r.callback)(event, component_id))
            .unwrap_or(false)
    })
    .unwrap_or(false)
}

/// The AST→IR fallthrough: let a registered plugin parser consume an
/// unknown property. Reports `false` when no parser claims it (including
/// when the registry was never initialized).
pub fn try_parse_property(component: &mut Component, name: &str, value: &str) -> bool {
    with_registry(|state| {
        state
            .property_parsers
            .get(name)
            .map(|r| (r.callback)(component, name, value))
            .unwrap_or(false)
    })
    .unwrap_or(false)
}

/// Register a property parser at module scope (outside any plugin).
pub fn register_property_parser(
    name: impl Into<String>,
    callback: PropertyParserFn,
) -> Result<(), CapabilityError> {
    let name = name.into();
    with_registry(|state| {
        register_slot(
            &mut state.property_parsers,
            "property parser",
            name.clone(),
            name.clone(),
            "core",
            callback,
        )
    })?
}

/// Translate a snake_case component name to its numeric type id.
pub fn get_component_type_id(name: &str) -> Option<u32> {
    ComponentType::from_snake_case(name).map(|t| t.type_id())
}

/// Publish a variable's current value so plugins can read it (renderer
/// side; does not enqueue an update).
pub fn publish_state(variable: impl Into<String>, update: StateUpdate) {
    let variable = variable.into();
    let _ = with_registry(|state| {
        state.state_mirror.insert(variable, update);
    });
}

/// Drain queued state updates (renderer side of the producer/consumer
/// pair).
pub fn drain_state_updates() -> Vec<StateUpdate> {
    with_registry(|state| state.state_updates.drain(..).collect()).unwrap_or_default()
}

/// Drain queued dirty marks.
pub fn drain_dirty_marks() -> Vec<u32> {
    with_registry(|state| state.dirty_marks.drain(..).collect()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Tests share the process-wide registry; serialize them.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn with_fresh_registry(f: impl FnOnce()) {
        let _guard = TEST_LOCK.lock();
        shutdown();
        init().unwrap();
        f();
        shutdown();
    }

    struct CodePlugin;

    impl Plugin for CodePlugin {
        fn metadata(&self) -> PluginMetadata {
            PluginMetadata {
                name: "code".to_string(),
                version: "0.1.0".to_string(),
                description: Some("code block rendering".to_string()),
            }
        }

        fn initialize(&mut self, registrar: &mut Registrar<'_>) -> Result<(), CapabilityError> {
            if !registrar.api_version().is_compatible(&ApiVersion::CURRENT) {
                return Err(CapabilityError::VersionMismatch {
                    host: registrar.api_version(),
                    requested: ApiVersion::CURRENT.major,
                });
            }
            registrar.register_web_renderer(ComponentType::CodeBlock, |handle, _theme| {
                handle
                    .primary_text()
                    .map(|code| format!("<pre>{code}</pre>"))
            })?;
            registrar.register_css_generator(ComponentType::CodeBlock, |theme| {
                Some(format!(".code_block {{ /* {theme} */ }}"))
            })?;
            registrar.register_property_parser("highlightLine", |component, _name, value| {
                let data = component
                    .custom_data
                    .get_or_insert_with(|| json!({}));
                data["highlight_line"] = json!(value.parse::<i64>().unwrap_or(0));
                true
            })?;
            Ok(())
        }
    }

    struct FailingPlugin;

    impl Plugin for FailingPlugin {
        fn metadata(&self) -> PluginMetadata {
            PluginMetadata {
                name: "broken".to_string(),
                version: "0.0.1".to_string(),
                description: None,
            }
        }

        fn initialize(&mut self, registrar: &mut Registrar<'_>) -> Result<(), CapabilityError> {
            // Registers something, then fails: the registration must be
            // rolled back.
            registrar.register_css_generator(ComponentType::Badge, |_| None)?;
            Err(CapabilityError::PluginInitFailed("broken".to_string()))
        }
    }

    #[test]
    fn test_lifecycle() {
        let _guard = TEST_LOCK.lock();
        shutdown();
        assert!(!is_initialized());
        assert_eq!(
            load_plugin(Box::new(CodePlugin)).unwrap_err(),
            CapabilityError::NotInitialized
        );
        init().unwrap();
        assert!(is_initialized());
        assert_eq!(init().unwrap_err(), CapabilityError::AlreadyInitialized);
        shutdown();
        assert!(!is_initialized());
    }

    #[test]
    fn test_plugin_dispatch_roundtrip() {
        with_fresh_registry(|| {
            load_plugin(Box::new(CodePlugin)).unwrap();

            let mut component = Component::new(ComponentType::CodeBlock, 9);
            component.custom_data = Some(json!({"code": "let x = 1", "language": "js"}));
            let handle = DataHandle::new(&component).unwrap();

            let html = render_web(ComponentType::CodeBlock, &handle, "dark").unwrap();
            assert_eq!(html, "<pre>let x = 1</pre>");
            let css = generate_css(ComponentType::CodeBlock, "dark").unwrap();
            assert!(css.contains("dark"));

            // Missing registration: None, not an error
            assert!(render_web(ComponentType::Badge, &handle, "dark").is_none());
        });
    }

    #[test]
    fn test_duplicate_registration_is_error() {
        with_fresh_registry(|| {
            load_plugin(Box::new(CodePlugin)).unwrap();
            let err = load_plugin(Box::new(CodePlugin)).unwrap_err();
            assert!(matches!(err, CapabilityError::DuplicateRegistration { .. }));
        });
    }

    #[test]
    fn test_failed_plugin_rolls_back_registrations() {
        with_fresh_registry(|| {
            assert!(load_plugin(Box::new(FailingPlugin)).is_err());
            assert!(loaded_plugins().is_empty());
            // The Badge css generator it registered must be gone
            assert!(generate_css(ComponentType::Badge, "x").is_none());
        });
    }

    #[test]
    fn test_unload_removes_registrations() {
        with_fresh_registry(|| {
            load_plugin(Box::new(CodePlugin)).unwrap();
            unload_plugin("code").unwrap();
            assert!(loaded_plugins().is_empty());
            assert!(generate_css(ComponentType::CodeBlock, "x").is_none());
            assert_eq!(
                unload_plugin("code").unwrap_err(),
                CapabilityError::UnknownPlugin("code".to_string())
            );
        });
    }

    #[test]
    fn test_property_parser_extension() {
        with_fresh_registry(|| {
            load_plugin(Box::new(CodePlugin)).unwrap();
            let mut component = Component::new(ComponentType::CodeBlock, 1);
            assert!(try_parse_property(&mut component, "highlightLine", "7"));
            assert_eq!(
                component.custom_data.as_ref().unwrap()["highlight_line"],
                json!(7)
            );
            assert!(!try_parse_property(&mut component, "unknownProp", "x"));
        });
    }

    struct CommandPlugin;

    impl Plugin for CommandPlugin {
        fn metadata(&self) -> PluginMetadata {
            PluginMetadata {
                name: "commands".to_string(),
                version: "0.1.0".to_string(),
                description: None,
            }
        }

        fn initialize(&mut self, registrar: &mut Registrar<'_>) -> Result<(), CapabilityError> {
            registrar.register_command_handler("reload", |command, args| {
                command == "reload" && args.get("force").is_some()
            })?;
            registrar.register_event_handler("flow_node_clicked", |_, component_id| {
                component_id > 0
            })?;
            Ok(())
        }
    }

    #[test]
    fn test_command_and_event_dispatch() {
        with_fresh_registry(|| {
            load_plugin(Box::new(CommandPlugin)).unwrap();
            assert!(dispatch_command("reload", &json!({"force": true})));
            assert!(!dispatch_command("reload", &json!({})));
            assert!(!dispatch_command("unknown", &json!({})));
            assert!(dispatch_event("flow_node_clicked", 4));
            assert!(!dispatch_event("other_event", 4));
        });
    }

    #[test]
    fn test_component_type_id_translation() {
        assert_eq!(
            get_component_type_id("code_block"),
            Some(ComponentType::CodeBlock.type_id())
        );
        assert_eq!(
            get_component_type_id("table_header_cell"),
            Some(ComponentType::TableHeaderCell.type_id())
        );
        assert_eq!(get_component_type_id("not_a_component"), None);
    }

    #[test]
    fn test_state_update_queues() {
        with_fresh_registry(|| {
            with_registry(|state| {
                let mut registrar = Registrar {
                    state,
                    owner: "test".to_string(),
                };
                registrar.queue_state_update_int("count", 3);
                registrar.queue_state_update_string("label", "done");
                registrar.queue_dirty_mark(12);
                // A plugin sees its own writes before the renderer drains
                assert_eq!(registrar.get_state_int("count"), Some(3));
                assert_eq!(registrar.get_state_string("label"), Some("done".to_string()));
                assert_eq!(registrar.get_state_int("label"), None);
            })
            .unwrap();

            let updates = drain_state_updates();
            assert_eq!(
                updates,
                vec![
                    StateUpdate::Int {
                        variable: "count".to_string(),
                        value: 3
                    },
                    StateUpdate::String {
                        variable: "label".to_string(),
                        value: "done".to_string()
                    },
                ]
            );
            assert_eq!(drain_dirty_marks(), vec![12]);
            // Drained queues are empty
            assert!(drain_state_updates().is_empty());

            // The renderer can publish without enqueueing
            publish_state(
                "count",
                StateUpdate::Int {
                    variable: "count".to_string(),
                    value: 9,
                },
            );
            with_registry(|state| {
                let registrar = Registrar {
                    state,
                    owner: "test".to_string(),
                };
                assert_eq!(registrar.get_state_int("count"), Some(9));
            })
            .unwrap();
            assert!(drain_state_updates().is_empty());
        });
    }
}
