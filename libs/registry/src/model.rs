//! The numeric Asset/Instance/Field object tree (spec §3), used for
//! standard LWM2M objects (the reserved first-segment ids of spec §3/§6,
//! e.g. the built-in object 9) and for `WriteObjectToTLV` (spec §4.A).
//!
//! This is a distinct addressing scheme from the flat asset-data path store
//! in [`crate::registry`]: objects here are addressed by `(app_name,
//! asset_id)` or `(app_name, asset_name)` plus numeric instance/field ids,
//! the way the wire TLV format addresses them, rather than by slash-path.
//! The two layers share the same `conn_types::Value`/`FieldType`/
//! `ResourceMode` vocabulary but own separate storage — the real system's
//! "asset data" (AirVantage, path-addressed) and "standard object"
//! (LWM2M, id-addressed) layers are related but distinct, and collapsing
//! them into one tree would force every standard object's numeric field id
//! to also carry a slash-path identity it doesn't otherwise need.

use crate::handler::{ActionKind, ArgList, Handler};
use conn_types::{check_type_stable, AccessMask, ConnError, ConnResult, Handle, ResourceMode, Side, Slab};
use conn_types::{FieldType, Value};
use std::collections::HashMap;
use tracing::debug;

/// Declares one field to be materialized on every instance of an asset,
/// supplied by the (possibly static, possibly hard-coded) object model at
/// asset-creation time (spec §3: "Fields are created at instance
/// construction from the model").
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub id: u16,
    pub name: String,
    pub mode: ResourceMode,
    pub initial: Value,
}

pub struct Field {
    pub id: u16,
    pub name: String,
    pub mode: ResourceMode,
    pub is_observe: bool,
    pub token: Option<Vec<u8>>,
    pub value: Value,
}

impl Field {
    fn from_spec(spec: &FieldSpec) -> Self {
        Self {
            id: spec.id,
            name: spec.name.clone(),
            mode: spec.mode,
            is_observe: false,
            token: None,
            value: spec.initial.clone(),
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.value.field_type()
    }

    pub fn access_for(&self, side: Side) -> AccessMask {
        self.mode.access_for(side)
    }
}

pub struct Instance {
    pub id: u16,
    pub asset: Handle<Asset>,
    pub fields: Vec<Field>,
}

impl Instance {
    pub fn field(&self, field_id: u16) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    pub fn field_mut(&mut self, field_id: u16) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.id == field_id)
    }
}

struct HandlerSlot<Ctx> {
    /// `None` means asset-scoped (fires for any field with no more specific
    /// field-scoped handler); `Some(id)` is field-scoped.
    field_id: Option<u16>,
    handler: Handler<Ctx>,
}

pub struct Asset {
    pub app_name: String,
    pub asset_id: u16,
    pub asset_name: Option<String>,
    pub instances: Vec<Instance>,
    pub last_instance_id: i64,
    pub is_observe: bool,
    pub token: Option<Vec<u8>>,
    field_specs: Vec<FieldSpec>,
}

impl Asset {
    pub fn instance(&self, id: u16) -> Option<&Instance> {
        self.instances.iter().find(|i| i.id == id)
    }

    pub fn instance_mut(&mut self, id: u16) -> Option<&mut Instance> {
        self.instances.iter_mut().find(|i| i.id == id)
    }
}

/// The numeric Asset/Instance/Field tree, independent of the path store.
pub struct ObjectModel<Ctx> {
    assets: Slab<Asset>,
    by_id: HashMap<(String, u16), Handle<Asset>>,
    by_name: HashMap<(String, String), Handle<Asset>>,
    handlers: HashMap<Handle<Asset>, Vec<HandlerSlot<Ctx>>>,
}

impl<Ctx> Default for ObjectModel<Ctx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ctx> ObjectModel<Ctx> {
    pub fn new() -> Self {
        Self {
            assets: Slab::new(),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            handlers: HashMap::new(),
        }
    }

    /// Explicit asset creation (spec §3: "Assets are created lazily on
    /// first instance creation ... or explicitly"). `field_specs` is the
    /// static model used to materialize fields on every instance created
    /// under this asset.
    pub fn create_asset(
        &mut self,
        app_name: impl Into<String>,
        asset_id: u16,
        asset_name: Option<String>,
        field_specs: Vec<FieldSpec>,
    ) -> ConnResult<Handle<Asset>> {
        let app_name = app_name.into();
        if self.by_id.contains_key(&(app_name.clone(), asset_id)) {
            return Err(ConnError::duplicate(format!(
                "asset ({app_name}, {asset_id}) already exists"
            )));
        }
        if let Some(name) = &asset_name {
            if self.by_name.contains_key(&(app_name.clone(), name.clone())) {
                return Err(ConnError::duplicate(format!(
                    "asset ({app_name}, {name}) already exists"
                )));
            }
        }
        let handle = self.assets.insert(Asset {
            app_name: app_name.clone(),
            asset_id,
            asset_name: asset_name.clone(),
            instances: Vec::new(),
            last_instance_id: -1,
            is_observe: false,
            token: None,
            field_specs,
        });
        self.by_id.insert((app_name.clone(), asset_id), handle);
        if let Some(name) = asset_name {
            self.by_name.insert((app_name, name), handle);
        }
        Ok(handle)
    }

    pub fn get_asset_by_id(&self, app_name: &str, asset_id: u16) -> Option<Handle<Asset>> {
        self.by_id.get(&(app_name.to_string(), asset_id)).copied()
    }

    pub fn get_asset_by_name(&self, app_name: &str, asset_name: &str) -> Option<Handle<Asset>> {
        self.by_name
            .get(&(app_name.to_string(), asset_name.to_string()))
            .copied()
    }

    pub fn asset(&self, handle: Handle<Asset>) -> Option<&Asset> {
        self.assets.get(handle)
    }

    pub fn asset_mut(&mut self, handle: Handle<Asset>) -> Option<&mut Asset> {
        self.assets.get_mut(handle)
    }

    /// Iterate every live asset (used by the registration-update renderer).
    pub fn iter_assets(&self) -> impl Iterator<Item = (Handle<Asset>, &Asset)> {
        self.assets.iter()
    }

    /// Create an instance under `asset`. `requested_id`, if supplied, is
    /// used directly and advances `last_instance_id`; otherwise the next id
    /// is `last_instance_id + 1` (spec §4.B "Last-instance-id allocation").
    pub fn create_instance(
        &mut self,
        asset: Handle<Asset>,
        requested_id: Option<u16>,
    ) -> ConnResult<u16> {
        let field_specs = {
            let a = self
                .assets
                .get(asset)
                .ok_or_else(|| ConnError::not_found("create_instance: unknown asset"))?;
            a.field_specs.clone()
        };
        let a = self
            .assets
            .get_mut(asset)
            .ok_or_else(|| ConnError::not_found("create_instance: unknown asset"))?;

        let id = match requested_id {
            Some(id) => {
                if a.instances.iter().any(|i| i.id == id) {
                    return Err(ConnError::duplicate(format!(
                        "instance {id} already exists on this asset"
                    )));
                }
                a.last_instance_id = a.last_instance_id.max(id as i64);
                id
            }
            None => {
                a.last_instance_id += 1;
                a.last_instance_id as u16
            }
        };

        let fields = field_specs.iter().map(Field::from_spec).collect();
        a.instances.push(Instance { id, asset, fields });
        debug!(asset_id = a.asset_id, instance_id = id, "instance created");
        Ok(id)
    }

    /// Delete one instance. If it was the asset's last instance, the asset
    /// itself is deleted too and both lookup keys are removed (spec §3
    /// lifecycle, §8 invariant 3).
    pub fn delete_instance(&mut self, asset: Handle<Asset>, instance_id: u16) -> ConnResult<()> {
        let a = self
            .assets
            .get_mut(asset)
            .ok_or_else(|| ConnError::not_found("delete_instance: unknown asset"))?;
        let position = a
            .instances
            .iter()
            .position(|i| i.id == instance_id)
            .ok_or_else(|| ConnError::not_found(format!("instance {instance_id} does not exist")))?;
        a.instances.remove(position);

        if a.instances.is_empty() {
            let app_name = a.app_name.clone();
            let asset_id = a.asset_id;
            let asset_name = a.asset_name.clone();
            self.assets.remove(asset);
            self.by_id.remove(&(app_name.clone(), asset_id));
            if let Some(name) = asset_name {
                self.by_name.remove(&(app_name, name));
            }
            self.handlers.remove(&asset);
            debug!(asset_id, "last instance deleted; asset removed");
        }
        Ok(())
    }

    /// Register a handler. `field_id = None` is asset-scoped; the
    /// field-scoped variant takes priority when both are registered for
    /// the same action (spec §3: "registered action handlers (field-scoped
    /// and asset-scoped)").
    pub fn add_handler(
        &mut self,
        asset: Handle<Asset>,
        field_id: Option<u16>,
        handler: Handler<Ctx>,
    ) {
        self.handlers
            .entry(asset)
            .or_default()
            .push(HandlerSlot { field_id, handler });
    }

    /// Invoke the most specific registered handler (field-scoped, else
    /// asset-scoped) for `(asset, field_id, kind)`, if any.
    pub fn dispatch(
        &mut self,
        asset: Handle<Asset>,
        field_id: u16,
        kind: ActionKind,
        path_for_handler: &conn_types::AssetDataPath,
        args: &ArgList,
        ctx: &mut Ctx,
    ) -> bool {
        let Some(slots) = self.handlers.get_mut(&asset) else {
            return false;
        };
        if let Some(slot) = slots.iter_mut().find(|s| s.field_id == Some(field_id)) {
            slot.handler.invoke(path_for_handler, kind, args, ctx);
            return true;
        }
        if let Some(slot) = slots.iter_mut().find(|s| s.field_id.is_none()) {
            slot.handler.invoke(path_for_handler, kind, args, ctx);
            return true;
        }
        false
    }

    /// Type-checked field write used by instance-write decode (server side)
    /// and direct id-addressed sets. Enforces the access mask for `side`.
    pub fn set_field(
        &mut self,
        asset: Handle<Asset>,
        instance_id: u16,
        field_id: u16,
        value: Value,
        side: Side,
    ) -> ConnResult<()> {
        let a = self
            .assets
            .get_mut(asset)
            .ok_or_else(|| ConnError::not_found("set_field: unknown asset"))?;
        let instance = a
            .instance_mut(instance_id)
            .ok_or_else(|| ConnError::not_found(format!("instance {instance_id} does not exist")))?;
        let field = instance
            .field_mut(field_id)
            .ok_or_else(|| ConnError::not_found(format!("field {field_id} does not exist")))?;
        if !field.access_for(side).can_write() {
            return Err(ConnError::not_permitted(format!(
                "field {field_id} is not writable by {side:?}"
            )));
        }
        check_type_stable(field.field_type(), value.field_type())?;
        field.value = value;
        Ok(())
    }
}

/// Field ids of the standard LWM2M Firmware Update object (object 9), the
/// hard-coded object spec §9 singles out: `state` (5), `update_result` (3),
/// `pkg_name` (6), `pkg_version` (7). A minimal but representative subset —
/// enough to exercise the fatal-at-init contract without modeling the whole
/// FOTA state machine, which spec §1 explicitly scopes out.
fn object_9_field_specs() -> Vec<FieldSpec> {
    vec![
        FieldSpec {
            id: 3,
            name: "update_result".to_string(),
            mode: ResourceMode::Variable,
            initial: Value::Int(0),
        },
        FieldSpec {
            id: 5,
            name: "state".to_string(),
            mode: ResourceMode::Variable,
            initial: Value::Int(0),
        },
        FieldSpec {
            id: 6,
            name: "pkg_name".to_string(),
            mode: ResourceMode::Variable,
            initial: Value::string("").unwrap(),
        },
        FieldSpec {
            id: 7,
            name: "pkg_version".to_string(),
            mode: ResourceMode::Variable,
            initial: Value::string("").unwrap(),
        },
    ]
}

/// Construct the built-in object 9 (Firmware Update) and its sole instance
/// under the reserved `"lwm2m"` app name. Called once at gateway startup;
/// spec §9 marks failure here as fatal to the process, unlike every other
/// registry operation, which always returns a recoverable `ConnResult`.
pub fn bootstrap_object_9<Ctx>(objects: &mut ObjectModel<Ctx>) -> ConnResult<Handle<Asset>> {
    let asset = objects.create_asset("lwm2m", 9, None, object_9_field_specs())?;
    objects.create_instance(asset, Some(0))?;
    debug!("built-in object 9 (Firmware Update) constructed");
    Ok(asset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_field(id: u16, name: &str) -> FieldSpec {
        FieldSpec {
            id,
            name: name.to_string(),
            mode: ResourceMode::Variable,
            initial: Value::Int(0),
        }
    }

    #[test]
    fn instance_back_reference_resolves_to_owning_asset() {
        let mut model: ObjectModel<()> = ObjectModel::new();
        let asset = model
            .create_asset("legato", 9, None, vec![int_field(1, "state")])
            .unwrap();
        let instance_id = model.create_instance(asset, None).unwrap();
        let a = model.asset(asset).unwrap();
        let instance = a.instance(instance_id).unwrap();
        assert_eq!(instance.asset, asset);
    }

    #[test]
    fn last_instance_deleted_removes_asset_and_both_lookup_keys() {
        let mut model: ObjectModel<()> = ObjectModel::new();
        let asset = model
            .create_asset("legato", 9, Some("swMgmt".to_string()), vec![int_field(1, "state")])
            .unwrap();
        let instance_id = model.create_instance(asset, None).unwrap();
        model.delete_instance(asset, instance_id).unwrap();

        assert!(model.asset(asset).is_none());
        assert!(model.get_asset_by_id("legato", 9).is_none());
        assert!(model.get_asset_by_name("legato", "swMgmt").is_none());
    }

    #[test]
    fn explicit_instance_id_advances_last_instance_id() {
        let mut model: ObjectModel<()> = ObjectModel::new();
        let asset = model.create_asset("legato", 1, None, vec![int_field(1, "v")]).unwrap();
        model.create_instance(asset, Some(5)).unwrap();
        let next = model.create_instance(asset, None).unwrap();
        assert_eq!(next, 6);
    }

    #[test]
    fn duplicate_explicit_instance_id_is_rejected() {
        let mut model: ObjectModel<()> = ObjectModel::new();
        let asset = model.create_asset("legato", 1, None, vec![int_field(1, "v")]).unwrap();
        model.create_instance(asset, Some(0)).unwrap();
        assert!(model.create_instance(asset, Some(0)).is_err());
    }

    #[test]
    fn field_scoped_handler_takes_priority_over_asset_scoped() {
        let mut model: ObjectModel<Vec<&'static str>> = ObjectModel::new();
        let asset = model.create_asset("legato", 1, None, vec![int_field(1, "v")]).unwrap();
        model.add_handler(asset, None, Handler::new(|_, _, _, ctx| ctx.push("asset")));
        model.add_handler(asset, Some(1), Handler::new(|_, _, _, ctx| ctx.push("field")));

        let mut ctx = Vec::new();
        let path = conn_types::AssetDataPath::parse("/legato/v").unwrap();
        let fired = model.dispatch(asset, 1, ActionKind::Write, &path, &ArgList::empty(), &mut ctx);
        assert!(fired);
        assert_eq!(ctx, vec!["field"]);
    }

    #[test]
    fn object_9_bootstraps_with_one_instance_and_expected_fields() {
        let mut model: ObjectModel<()> = ObjectModel::new();
        let asset = bootstrap_object_9(&mut model).unwrap();
        let a = model.asset(asset).unwrap();
        assert_eq!(a.app_name, "lwm2m");
        assert_eq!(a.asset_id, 9);
        assert_eq!(a.instances.len(), 1);
        let instance = a.instance(0).unwrap();
        assert!(instance.field(5).is_some(), "expected a state field");
    }

    #[test]
    fn object_9_bootstrap_twice_is_fatal_duplicate() {
        let mut model: ObjectModel<()> = ObjectModel::new();
        bootstrap_object_9(&mut model).unwrap();
        let err = bootstrap_object_9(&mut model).unwrap_err();
        assert_eq!(err.kind, conn_types::Kind::Duplicate);
    }

    #[test]
    fn set_field_rejects_write_without_permission() {
        let mut model: ObjectModel<()> = ObjectModel::new();
        let asset = model
            .create_asset(
                "legato",
                1,
                None,
                vec![FieldSpec {
                    id: 1,
                    name: "ro".to_string(),
                    mode: ResourceMode::Setting,
                    initial: Value::Int(0),
                }],
            )
            .unwrap();
        let instance_id = model.create_instance(asset, None).unwrap();
        let err = model
            .set_field(asset, instance_id, 1, Value::Int(5), Side::Client)
            .unwrap_err();
        assert_eq!(err.kind, conn_types::Kind::NotPermitted);
    }
}
