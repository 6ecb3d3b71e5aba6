//! Schema registry for the shared `components/schemas` map.
//!
//! Named model schemas accumulate here while parameters and bodies emit;
//! `$ref`s always point at the key the registry chose. When two distinct
//! types share a display name the registry disambiguates the later one
//! with its module-path-qualified key, so both schemas coexist and every
//! `$ref` still resolves to the right definition.

use std::collections::HashMap;

use indexmap::IndexMap;

use presto_params::ModelName;

use crate::openapi::{Components, ComponentsBuilder, ObjectBuilder, Ref, RefOr, Schema};

/// Separator joining module path segments in disambiguated keys.
const QUALIFIED_SEPARATOR: &str = "__";

/// Accumulates component schemas during document emission.
#[derive(Default)]
pub struct ComponentRegistry {
	schemas: IndexMap<String, Schema>,
	// display name -> module path of the first registrant
	claims: HashMap<String, String>,
}

impl ComponentRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// The component key this model lives under.
	///
	/// First registrant keeps the bare display name; a later distinct
	/// type with the same display name gets `module__path__Name`.
	pub fn key_for(&mut self, model: &ModelName) -> String {
		match self.claims.get(&model.name) {
			None => {
				self.claims
					.insert(model.name.clone(), model.module_path.clone());
				model.name.clone()
			}
			Some(module_path) if *module_path == model.module_path => model.name.clone(),
			Some(_) => model.qualified(QUALIFIED_SEPARATOR),
		}
	}

	/// Register a named schema, building it at most once.
	///
	/// The builder callback receives the registry so nested models can
	/// register themselves; a placeholder guards self-referential types.
	pub fn register(
		&mut self,
		model: &ModelName,
		build: impl FnOnce(&mut Self) -> Schema,
	) -> String {
		let key = self.key_for(model);
		if !self.schemas.contains_key(&key) {
			self.schemas
				.insert(key.clone(), Schema::Object(ObjectBuilder::new().build()));
			let schema = build(self);
			self.schemas.insert(key.clone(), schema);
		}
		key
	}

	/// A `$ref` to a registered component key.
	pub fn schema_ref(key: &str) -> RefOr<Schema> {
		RefOr::Ref(Ref::new(format!("#/components/schemas/{key}")))
	}

	pub fn contains(&self, key: &str) -> bool {
		self.schemas.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.schemas.len()
	}

	pub fn is_empty(&self) -> bool {
		self.schemas.is_empty()
	}

	/// Export the accumulated schemas as OpenAPI components.
	pub fn to_components(&self) -> Components {
		let mut builder = ComponentsBuilder::new();
		for (name, schema) in &self.schemas {
			builder = builder.schema(name, schema.clone());
		}
		builder.build()
	}
}
