//! Endpoint registry: logical resource names mapped to REST paths.
//!
//! # Design
//! The built-in resources form a closed `Entity` enum generated from one
//! declarative table, so adding a resource is a single table row. Custom
//! tables (tests, variant deployments) go through `EndpointRegistry::
//! from_descriptors`, which is where duplicate names and empty paths are
//! rejected.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;
use crate::path;

macro_rules! endpoints {
    ($( $variant:ident => $name:literal : $path:literal, )+) => {
        /// Every resource the admin API exposes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Entity {
            $( $variant, )+
        }

        impl Entity {
            pub const ALL: &'static [Entity] = &[ $( Entity::$variant, )+ ];

            /// Logical name used by application code.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Entity::$variant => $name, )+
                }
            }

            /// Path as declared in the table, before normalization.
            pub fn declared_path(self) -> &'static str {
                match self {
                    $( Entity::$variant => $path, )+
                }
            }
        }
    };
}

endpoints! {
    // masters
    Continents => "continents": "masters/continents",
    Countries => "countries": "masters/countries",
    States => "states": "masters/states",
    Districts => "districts": "masters/districts",
    Cities => "cities": "masters/cities",
    Zones => "zones": "masters/zones",
    Wards => "wards": "masters/wards",
    Bins => "bins": "masters/bins",
    BinTypes => "binTypes": "masters/bin-types",
    WasteTypes => "wasteTypes": "masters/waste-types",
    FuelTypes => "fuelTypes": "masters/fuel-types",
    VehicleTypes => "vehicleTypes": "masters/vehicle-types",
    // fleet
    VehicleCreations => "vehicleCreations": "vehicles/vehicle-creation",
    VehicleAssignments => "vehicleAssignments": "vehicles/vehicle-assignment",
    FuelLogs => "fuelLogs": "vehicles/fuel-logs",
    MaintenanceRecords => "maintenanceRecords": "vehicles/maintenance",
    // staff
    Drivers => "drivers": "staff/drivers",
    Employees => "employees": "staff/employees",
    Attendance => "attendance": "staff/attendance",
    // operations
    CollectionRoutes => "collectionRoutes": "operations/routes",
    Trips => "trips": "operations/trips",
    Pickups => "pickups": "operations/pickups",
    Complaints => "complaints": "operations/complaints",
    // customers
    Customers => "customers": "customers/customers",
    Properties => "properties": "customers/properties",
    // administration
    Users => "users": "administration/users",
    Roles => "roles": "administration/roles",
    Permissions => "permissions": "administration/permissions",
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Entity {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for Entity {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Entity::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| ApiError::UnknownEntity(s.to_string()))
    }
}

/// One logical name bound to its normalized resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub logical_name: String,
    pub resource_path: String,
}

impl EndpointDescriptor {
    pub fn new(logical_name: impl Into<String>, resource_path: &str) -> Self {
        Self {
            logical_name: logical_name.into(),
            resource_path: path::normalize(resource_path),
        }
    }
}

impl From<Entity> for EndpointDescriptor {
    fn from(entity: Entity) -> Self {
        Self::new(entity.as_str(), entity.declared_path())
    }
}

/// Immutable name-to-path table.
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    descriptors: Vec<EndpointDescriptor>,
    index: HashMap<String, usize>,
}

impl EndpointRegistry {
    /// Registry of every `Entity`.
    pub fn builtin() -> Self {
        // Enum variants carry distinct names and non-root paths.
        let descriptors: Vec<_> = Entity::ALL.iter().map(|e| EndpointDescriptor::from(*e)).collect();
        let index = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.logical_name.clone(), i))
            .collect();
        Self { descriptors, index }
    }

    pub fn from_descriptors<I>(descriptors: I) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = EndpointDescriptor>,
    {
        let mut registry = Self {
            descriptors: Vec::new(),
            index: HashMap::new(),
        };
        for descriptor in descriptors {
            if path::is_root(&descriptor.resource_path) {
                return Err(ApiError::InvalidResourcePath(descriptor.logical_name));
            }
            if registry.index.contains_key(&descriptor.logical_name) {
                return Err(ApiError::DuplicateRegistration(descriptor.logical_name));
            }
            registry
                .index
                .insert(descriptor.logical_name.clone(), registry.descriptors.len());
            registry.descriptors.push(descriptor);
        }
        Ok(registry)
    }

    /// Shorthand for `(name, path)` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::from_descriptors(pairs.into_iter().map(|(name, p)| EndpointDescriptor::new(name, p)))
    }

    pub fn resolve_path(&self, logical_name: &str) -> Result<&str, ApiError> {
        self.index
            .get(logical_name)
            .map(|&i| self.descriptors[i].resource_path.as_str())
            .ok_or_else(|| ApiError::UnknownEntity(logical_name.to_string()))
    }

    /// Descriptors in declaration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_path_is_normalized() {
        let registry = EndpointRegistry::builtin();
        assert_eq!(registry.len(), Entity::ALL.len());
        for descriptor in registry.descriptors() {
            let p = &descriptor.resource_path;
            assert!(p.starts_with('/') && p.ends_with('/'), "{p}");
            assert!(!p.contains("//"), "{p}");
            assert!(p.len() > 2, "{p}");
        }
    }

    #[test]
    fn resolves_logical_names() {
        let registry = EndpointRegistry::builtin();
        assert_eq!(registry.resolve_path("continents").unwrap(), "/masters/continents/");
        assert_eq!(
            registry.resolve_path("vehicleCreations").unwrap(),
            "/vehicles/vehicle-creation/"
        );
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = EndpointRegistry::builtin().resolve_path("spaceships").unwrap_err();
        assert!(matches!(err, ApiError::UnknownEntity(name) if name == "spaceships"));
    }

    #[test]
    fn logical_names_are_unique() {
        let mut names: Vec<_> = Entity::ALL.iter().map(|e| e.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Entity::ALL.len());
    }

    #[test]
    fn entity_parses_from_logical_name() {
        assert_eq!("binTypes".parse::<Entity>().unwrap(), Entity::BinTypes);
        assert!(matches!("BinTypes".parse::<Entity>(), Err(ApiError::UnknownEntity(_))));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = EndpointRegistry::from_pairs([("bins", "masters/bins"), ("bins", "legacy/bins")]).unwrap_err();
        assert!(matches!(err, ApiError::DuplicateRegistration(name) if name == "bins"));
    }

    #[test]
    fn root_path_is_rejected() {
        let err = EndpointRegistry::from_pairs([("everything", "//")]).unwrap_err();
        assert!(matches!(err, ApiError::InvalidResourcePath(_)));
    }

    #[test]
    fn custom_table_keeps_declaration_order() {
        let registry = EndpointRegistry::from_pairs([("zones", "/zones"), ("bins", "bins/")]).unwrap();
        let names: Vec<_> = registry.descriptors().map(|d| d.logical_name.as_str()).collect();
        assert_eq!(names, ["zones", "bins"]);
        assert_eq!(registry.resolve_path("bins").unwrap(), "/bins/");
    }
}
