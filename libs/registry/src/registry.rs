//! The asset-data path registry (spec §4.B): a flat, observable
//! string-keyed store with access control, observer tokens, handler
//! dispatch, push, and the session facade folded in per spec §2.F.

use crate::handler::{ActionKind, ArgList, Handler};
use crate::model::ObjectModel;
use crate::pending::{PendingReadHandle, PendingReadTable};
use crate::session::{AvcCore, SessionFacade, SessionState};
use crate::timer::{DebounceTimer, RegistrationUpdateDebouncer};
use conn_codec::cbor;
use conn_config::constants::MAX_OBSERVER_TOKEN_BYTES;
use conn_types::{
    check_type_stable, AssetDataPath, ConnError, ConnResult, FieldType, Handle, ResourceMode, Side,
    Value,
};
use conn_pushqueue::{ContentType, PushAccepted, PushOutcome, PushQueue, PushTransport};
use std::collections::BTreeMap;
use tracing::{debug, warn};

struct PathEntry<Ctx> {
    mode: ResourceMode,
    value: Value,
    is_observe: bool,
    token: Option<Vec<u8>>,
    handler: Option<Handler<Ctx>>,
}

/// What a server-driven read resolved to (spec §4.B read-intercept
/// semantics, §9 Open Question).
pub enum ServerReadOutcome {
    /// No handler registered (or the handler already completed the read
    /// within the same call): the value is ready right now.
    Ready(Value),
    /// A handler is registered and is expected to supply the value later
    /// via `set_*`; the caller should poll [`Registry::drain_completed_reads`]
    /// after dispatching, since a synchronous handler may complete it in
    /// the very same tick.
    Deferred(PendingReadHandle),
}

/// Central registry: asset-data path store, handler dispatch, session
/// facade, registration-update debounce, and the numeric object model used
/// for standard LWM2M objects (spec §2 components B and F).
pub struct Registry<Ctx> {
    paths: BTreeMap<AssetDataPath, PathEntry<Ctx>>,
    pending: PendingReadTable,
    session: SessionFacade,
    debouncer: RegistrationUpdateDebouncer,
    pub objects: ObjectModel<Ctx>,
}

impl<Ctx> Default for Registry<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> Registry<Ctx> {
    pub fn new() -> Self {
        Self::with_debounce_secs(conn_config::constants::REGISTRATION_UPDATE_DEBOUNCE_SECS)
    }

    pub fn with_debounce_secs(debounce_secs: u64) -> Self {
        Self {
            paths: BTreeMap::new(),
            pending: PendingReadTable::new(),
            session: SessionFacade::new(),
            debouncer: RegistrationUpdateDebouncer::new(debounce_secs),
            objects: ObjectModel::new(),
        }
    }

    // -----------------------------------------------------------------
    // create_resource / path uniqueness (spec §3, §4.B)
    // -----------------------------------------------------------------

    pub fn create_resource(&mut self, path: AssetDataPath, mode: ResourceMode) -> ConnResult<()> {
        if let Some(existing) = self.paths.keys().find(|p| p.collides_with(&path)) {
            return Err(ConnError::duplicate(format!(
                "path {path} collides with existing path {existing}"
            )));
        }
        self.paths.insert(
            path,
            PathEntry {
                mode,
                value: Value::None,
                is_observe: false,
                token: None,
                handler: None,
            },
        );
        Ok(())
    }

    pub fn delete_resource(&mut self, path: &AssetDataPath) -> ConnResult<()> {
        self.paths
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ConnError::not_found(format!("path {path} does not exist")))
    }

    pub fn contains(&self, path: &AssetDataPath) -> bool {
        self.paths.contains_key(path)
    }

    // -----------------------------------------------------------------
    // typed set/get (spec §4.B)
    // -----------------------------------------------------------------

    fn entry(&self, path: &AssetDataPath) -> ConnResult<&PathEntry<Ctx>> {
        self.paths
            .get(path)
            .ok_or_else(|| ConnError::not_found(format!("path {path} does not exist")))
    }

    fn entry_mut(&mut self, path: &AssetDataPath) -> ConnResult<&mut PathEntry<Ctx>> {
        self.paths
            .get_mut(path)
            .ok_or_else(|| ConnError::not_found(format!("path {path} does not exist")))
    }

    fn check_writable(entry: &PathEntry<Ctx>, side: Side) -> ConnResult<()> {
        if !entry.mode.access_for(side).can_write() {
            return Err(ConnError::not_permitted("write not permitted for this side"));
        }
        Ok(())
    }

    fn set_typed(&mut self, path: &AssetDataPath, value: Value, side: Side) -> ConnResult<()> {
        let entry = self.entry_mut(path)?;
        Self::check_writable(entry, side)?;
        check_type_stable(entry.value.field_type(), value.field_type())?;
        entry.value = value.clone();
        self.pending.complete_for_path(path, &value);
        Ok(())
    }

    pub fn set_int(&mut self, path: &AssetDataPath, value: i64, side: Side) -> ConnResult<()> {
        self.set_typed(path, Value::Int(value), side)
    }

    pub fn set_float(&mut self, path: &AssetDataPath, value: f64, side: Side) -> ConnResult<()> {
        self.set_typed(path, Value::Float(value), side)
    }

    pub fn set_bool(&mut self, path: &AssetDataPath, value: bool, side: Side) -> ConnResult<()> {
        self.set_typed(path, Value::Bool(value), side)
    }

    pub fn set_string(&mut self, path: &AssetDataPath, value: impl Into<String>, side: Side) -> ConnResult<()> {
        self.set_typed(path, Value::string(value)?, side)
    }

    /// `null` yields a value of type `none`; unlike the typed setters this
    /// is always allowed regardless of the field's current type (spec §3:
    /// "`null` yields a value of type none"), and resets the type-stability
    /// tracking so the next typed write may establish a new type.
    pub fn set_null(&mut self, path: &AssetDataPath, side: Side) -> ConnResult<()> {
        let entry = self.entry_mut(path)?;
        Self::check_writable(entry, side)?;
        entry.value = Value::None;
        self.pending.complete_for_path(path, &Value::None);
        Ok(())
    }

    /// Set an untyped, already-decoded value (spec §4.E PUT: the dispatcher
    /// decodes a CBOR payload into a plain `Value` and has no static type to
    /// dispatch on the way the in-process typed setters do).
    pub fn set_value(&mut self, path: &AssetDataPath, value: Value, side: Side) -> ConnResult<()> {
        match value {
            Value::None => self.set_null(path, side),
            other => self.set_typed(path, other, side),
        }
    }

    fn get_typed(&self, path: &AssetDataPath, expected: FieldType, side: Side) -> ConnResult<&Value> {
        let entry = self.entry(path)?;
        if !entry.mode.access_for(side).can_read() {
            return Err(ConnError::not_permitted("read not permitted for this side"));
        }
        if entry.value.is_none() {
            return Err(ConnError::unavailable(format!("path {path} is type none")));
        }
        if entry.value.field_type() != expected {
            return Err(ConnError::bad_parameter(format!(
                "path {path} is {}, not {expected}",
                entry.value.field_type()
            )));
        }
        Ok(&entry.value)
    }

    pub fn get_int(&self, path: &AssetDataPath, out: &mut i64, side: Side) -> ConnResult<()> {
        *out = self.get_typed(path, FieldType::Int, side)?.as_int().unwrap();
        Ok(())
    }

    pub fn get_float(&self, path: &AssetDataPath, out: &mut f64, side: Side) -> ConnResult<()> {
        *out = self.get_typed(path, FieldType::Float, side)?.as_float().unwrap();
        Ok(())
    }

    pub fn get_bool(&self, path: &AssetDataPath, out: &mut bool, side: Side) -> ConnResult<()> {
        *out = self.get_typed(path, FieldType::Bool, side)?.as_bool().unwrap();
        Ok(())
    }

    pub fn get_string(&self, path: &AssetDataPath, out: &mut String, side: Side) -> ConnResult<()> {
        out.clear();
        out.push_str(self.get_typed(path, FieldType::String, side)?.as_str().unwrap());
        Ok(())
    }

    pub fn get_value(&self, path: &AssetDataPath) -> ConnResult<Value> {
        Ok(self.entry(path)?.value.clone())
    }

    pub fn mode_of(&self, path: &AssetDataPath) -> ConnResult<ResourceMode> {
        Ok(self.entry(path)?.mode)
    }

    // -----------------------------------------------------------------
    // observer tokens
    // -----------------------------------------------------------------

    pub fn set_observe(&mut self, path: &AssetDataPath, token: Vec<u8>) -> ConnResult<()> {
        if token.len() > MAX_OBSERVER_TOKEN_BYTES {
            return Err(ConnError::bad_parameter(format!(
                "observer token of {} bytes exceeds {MAX_OBSERVER_TOKEN_BYTES}-byte cap",
                token.len()
            )));
        }
        let entry = self.entry_mut(path)?;
        entry.is_observe = true;
        entry.token = Some(token);
        Ok(())
    }

    pub fn clear_observe(&mut self, path: &AssetDataPath) -> ConnResult<()> {
        let entry = self.entry_mut(path)?;
        entry.is_observe = false;
        entry.token = None;
        Ok(())
    }

    // -----------------------------------------------------------------
    // handlers (spec §4.B `add_resource_event_handler`)
    // -----------------------------------------------------------------

    pub fn add_resource_event_handler(&mut self, path: &AssetDataPath, handler: Handler<Ctx>) -> ConnResult<()> {
        let entry = self.entry_mut(path)?;
        if entry.handler.is_some() {
            warn!(%path, "overwriting existing resource event handler");
        }
        entry.handler = Some(handler);
        Ok(())
    }

    pub fn remove_resource_event_handler(&mut self, path: &AssetDataPath) -> ConnResult<()> {
        self.entry_mut(path)?.handler = None;
        Ok(())
    }

    /// Closest-ancestor handler lookup: exact path first, else the nearest
    /// registered ancestor (the "asset-scoped" fallback of spec §3).
    fn find_handler_path(&self, path: &AssetDataPath) -> Option<AssetDataPath> {
        if self
            .paths
            .get(path)
            .is_some_and(|e| e.handler.is_some())
        {
            return Some(path.clone());
        }
        self.paths
            .iter()
            .filter(|(candidate, entry)| entry.handler.is_some() && candidate.is_proper_ancestor_of(path))
            .map(|(candidate, _)| candidate.clone())
            .max_by_key(|candidate| candidate.depth())
    }

    /// Invoke the registered handler (if any) for a write that just landed
    /// on `path`, per spec §4.B: "write (after the new value is stored)".
    pub fn notify_write(&mut self, path: &AssetDataPath, ctx: &mut Ctx) {
        let Some(handler_path) = self.find_handler_path(path) else {
            return;
        };
        if let Some(entry) = self.paths.get_mut(&handler_path) {
            if let Some(handler) = &mut entry.handler {
                handler.invoke(path, ActionKind::Write, &ArgList::empty(), ctx);
            }
        }
    }

    /// Invoke the registered execute handler for `path`. Returns `false` if
    /// no handler is registered (dispatcher maps this to `4.04`).
    pub fn execute(&mut self, path: &AssetDataPath, args: &ArgList, ctx: &mut Ctx) -> bool {
        let Some(handler_path) = self.find_handler_path(path) else {
            return false;
        };
        if let Some(entry) = self.paths.get_mut(&handler_path) {
            if let Some(handler) = &mut entry.handler {
                handler.invoke(path, ActionKind::Execute, args, ctx);
                return true;
            }
        }
        false
    }

    /// Server-driven read with handler read-intercept (spec §4.B, §9 Open
    /// Question). Always defers when a handler is registered, even if that
    /// handler happens to complete the value synchronously within this
    /// call — the caller must check [`Registry::drain_completed_reads`]
    /// immediately after to catch the common synchronous case.
    pub fn server_read(&mut self, path: &AssetDataPath, ctx: &mut Ctx) -> ConnResult<ServerReadOutcome> {
        {
            let entry = self.entry(path)?;
            if !entry.mode.access_for(Side::Server).can_read() {
                return Err(ConnError::not_permitted("read not permitted for server"));
            }
        }
        if let Some(handler_path) = self.find_handler_path(path) {
            let ticket = self.pending.open(path.clone());
            if let Some(entry) = self.paths.get_mut(&handler_path) {
                if let Some(handler) = &mut entry.handler {
                    handler.invoke(path, ActionKind::Read, &ArgList::empty(), ctx);
                }
            }
            return Ok(ServerReadOutcome::Deferred(ticket));
        }
        let entry = self.entry(path)?;
        if entry.value.is_none() {
            return Err(ConnError::unavailable(format!("path {path} is type none")));
        }
        Ok(ServerReadOutcome::Ready(entry.value.clone()))
    }

    /// Drain pending reads completed by a `set_*` call since the last
    /// drain (spec §9 Open Question resolution, see [`crate::pending`]).
    pub fn drain_completed_reads(&mut self) -> Vec<(PendingReadHandle, Value)> {
        self.pending.drain_completed()
    }

    pub fn outstanding_pending_reads(&self) -> usize {
        self.pending.outstanding()
    }

    // -----------------------------------------------------------------
    // subtree enumeration (spec §4.B "Algorithms")
    // -----------------------------------------------------------------

    /// Every stored leaf strictly under `base`, sorted lexicographically so
    /// siblings at any depth are contiguous (spec §4.B). Access-filtered by
    /// `side`'s read permission.
    pub fn enumerate_subtree(&self, base: &AssetDataPath, side: Side) -> Vec<(AssetDataPath, Value)> {
        self.paths
            .iter()
            .filter(|(path, entry)| base.is_proper_ancestor_of(path) && entry.mode.access_for(side).can_read())
            .map(|(path, entry)| (path.clone(), entry.value.clone()))
            .collect()
    }

    pub fn is_ancestor_of_any(&self, base: &AssetDataPath) -> bool {
        self.paths.keys().any(|p| base.is_proper_ancestor_of(p))
    }

    // -----------------------------------------------------------------
    // push (spec §4.B `push`)
    // -----------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn push(
        &mut self,
        path: &AssetDataPath,
        queue: &mut PushQueue<Ctx>,
        transport: &mut impl PushTransport,
        done: impl FnOnce(PushOutcome, Ctx) + 'static,
        ctx: Ctx,
    ) -> ConnResult<PushAccepted> {
        let payload = if let Some(entry) = self.paths.get(path) {
            cbor::encode_leaf(&entry.value)?
        } else if self.is_ancestor_of_any(path) {
            let leaves = self.enumerate_subtree(path, Side::Client);
            cbor::encode_subtree(path, &leaves)?
        } else {
            return Err(ConnError::not_found(format!("path {path} does not exist")));
        };
        debug!(%path, bytes = payload.len(), "pushing asset-data path");
        Ok(queue.push(transport, payload, ContentType::Cbor, done, ctx)?)
    }

    // -----------------------------------------------------------------
    // session facade (spec §4.F)
    // -----------------------------------------------------------------

    pub fn add_session_listener(&mut self, listener: impl FnMut(SessionState) + 'static) {
        self.session.add_listener(listener);
    }

    pub fn request_session(&mut self, core: &mut impl AvcCore) -> Handle<crate::session::SessionRequestTag> {
        self.session.request_session(core)
    }

    pub fn release_session(
        &mut self,
        core: &mut impl AvcCore,
        handle: Handle<crate::session::SessionRequestTag>,
    ) -> ConnResult<()> {
        self.session.release_session(core, handle)
    }

    pub fn session_outstanding(&self) -> usize {
        self.session.outstanding()
    }

    // -----------------------------------------------------------------
    // registration-update debounce (spec §4.B, §6)
    // -----------------------------------------------------------------

    pub fn create_instance_with_registration_update(
        &mut self,
        asset: Handle<crate::model::Asset>,
        requested_id: Option<u16>,
        timer: &mut impl DebounceTimer,
    ) -> ConnResult<u16> {
        let id = self.objects.create_instance(asset, requested_id)?;
        self.debouncer.notify_instance_created(timer);
        Ok(id)
    }

    /// Called by the event loop when the debounce timer fires. Returns the
    /// registration-update line (spec §6: `</appName/assetId[/instanceId]>`
    /// entries, comma-separated) to send, if the timer was actually armed.
    pub fn on_registration_update_timer_fired(&mut self) -> Option<String> {
        if !self.debouncer.on_timer_fired() {
            return None;
        }
        Some(self.render_registration_update())
    }

    fn render_registration_update(&self) -> String {
        let mut entries = Vec::new();
        for (_, asset) in self.objects.iter_assets() {
            let app_name = normalize_app_name(&asset.app_name);
            for instance in &asset.instances {
                entries.push(format!("</{}/{}/{}>", app_name, asset.asset_id, instance.id));
            }
        }
        entries.join(",")
    }

    pub fn shutdown_timer(&mut self, timer: &mut impl DebounceTimer) {
        self.debouncer.shutdown(timer);
    }
}

/// App names other than the reserved `"lwm2m"` and `"legato"` are prefixed
/// with `"le_"` in registration-update traffic (spec §6).
fn normalize_app_name(app_name: &str) -> String {
    if app_name == "lwm2m" || app_name == "legato" {
        app_name.to_string()
    } else {
        format!("le_{app_name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CoreOpenResult;
    use conn_pushqueue::SubmitOutcome;
    use std::str::FromStr;

    struct ImmediateTransport {
        next_id: u64,
    }
    impl Default for ImmediateTransport {
        fn default() -> Self {
            Self { next_id: 1 }
        }
    }
    impl PushTransport for ImmediateTransport {
        fn submit(&mut self, _payload: &[u8], _content_type: ContentType) -> SubmitOutcome {
            let id = self.next_id;
            self.next_id += 1;
            SubmitOutcome::Submitted(id)
        }
    }

    struct NoopCore;
    impl AvcCore for NoopCore {
        fn open_session(&mut self) -> CoreOpenResult {
            CoreOpenResult::Opened
        }
        fn close_session(&mut self) {}
    }

    #[derive(Default)]
    struct NoopTimer;
    impl DebounceTimer for NoopTimer {
        fn schedule(&mut self, _delay_secs: u64) {}
        fn cancel(&mut self) {}
    }

    fn path(s: &str) -> AssetDataPath {
        AssetDataPath::from_str(s).unwrap()
    }

    #[test]
    fn create_resource_rejects_ancestor_and_descendant_collisions() {
        let mut reg: Registry<()> = Registry::new();
        reg.create_resource(path("/a/b"), ResourceMode::Variable).unwrap();
        assert!(reg.create_resource(path("/a"), ResourceMode::Variable).is_err());
        assert!(reg.create_resource(path("/a/b/c"), ResourceMode::Variable).is_err());
    }

    #[test]
    fn set_then_get_roundtrips() {
        let mut reg: Registry<()> = Registry::new();
        let p = path("/asset/v");
        reg.create_resource(p.clone(), ResourceMode::Variable).unwrap();
        reg.set_int(&p, 5, Side::Client).unwrap();
        let mut out = 0;
        reg.get_int(&p, &mut out, Side::Client).unwrap();
        assert_eq!(out, 5);
    }

    #[test]
    fn push_one_leaf_then_ack_fires_callback() {
        let mut reg: Registry<i32> = Registry::new();
        let p = path("/asset/v");
        reg.create_resource(p.clone(), ResourceMode::Variable).unwrap();
        reg.set_int(&p, 5, Side::Client).unwrap();

        let mut queue = PushQueue::new();
        let mut transport = ImmediateTransport::default();
        let fired = std::rc::Rc::new(std::cell::RefCell::new(None));
        let fired_clone = fired.clone();
        reg.push(&p, &mut queue, &mut transport, move |outcome, ctx| {
            *fired_clone.borrow_mut() = Some((outcome, ctx));
        }, 3)
        .unwrap();
        queue.ack(&mut transport, 1, PushOutcome::Success);
        assert_eq!(*fired.borrow(), Some((PushOutcome::Success, 3)));
    }

    #[test]
    fn server_get_on_ancestor_enumerates_readable_children() {
        let mut reg: Registry<()> = Registry::new();
        for (leaf, v) in [
            ("/asset/value1", Value::Int(5)),
            ("/asset/value2", Value::Float(3.14)),
        ] {
            reg.create_resource(path(leaf), ResourceMode::Variable).unwrap();
            reg.set_typed(&path(leaf), v, Side::Client).unwrap();
        }
        let children = reg.enumerate_subtree(&path("/asset"), Side::Server);
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn session_request_release_through_registry() {
        let mut reg: Registry<()> = Registry::new();
        let mut core = NoopCore;
        let h = reg.request_session(&mut core);
        assert_eq!(reg.session_outstanding(), 1);
        reg.release_session(&mut core, h).unwrap();
        assert_eq!(reg.session_outstanding(), 0);
    }

    #[test]
    fn read_intercept_defers_then_completes_same_tick_when_handler_writes_synchronously() {
        let mut reg: Registry<()> = Registry::new();
        let p = path("/asset/v");
        reg.create_resource(p.clone(), ResourceMode::Variable).unwrap();
        reg.set_int(&p, 1, Side::Client).unwrap();

        let inner_path = p.clone();
        reg.add_resource_event_handler(
            &p,
            Handler::new(move |_path, _kind, _args, _ctx: &mut ()| {
                // handler body runs outside the registry borrow in real
                // wiring; this test models the common synchronous case by
                // asserting on the ticket draining after the call returns.
                let _ = &inner_path;
            }),
        )
        .unwrap();

        let outcome = reg.server_read(&p, &mut ()).unwrap();
        let ServerReadOutcome::Deferred(ticket) = outcome else {
            panic!("expected deferred outcome when a handler is registered");
        };
        // The handler in this test doesn't write; a later external set_*
        // (e.g. the handler completing asynchronously) completes it.
        reg.set_int(&p, 42, Side::Server).unwrap();
        let completed = reg.drain_completed_reads();
        assert_eq!(completed, vec![(ticket, Value::Int(42))]);
    }

    #[test]
    fn registration_update_renders_reserved_and_prefixed_app_names() {
        let mut reg: Registry<()> = Registry::new();
        let lwm2m_asset = reg.objects.create_asset("lwm2m", 9, None, vec![]).unwrap();
        let custom_asset = reg.objects.create_asset("myApp", 1, None, vec![]).unwrap();
        let mut timer = NoopTimer::default();
        reg.create_instance_with_registration_update(lwm2m_asset, Some(0), &mut timer)
            .unwrap();
        reg.create_instance_with_registration_update(custom_asset, Some(0), &mut timer)
            .unwrap();
        let update = reg.on_registration_update_timer_fired().unwrap();
        assert!(update.contains("</lwm2m/9/0>"));
        assert!(update.contains("</le_myApp/1/0>"));
    }
}
