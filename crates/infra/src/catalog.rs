//! Fixed resource catalog.
//!
//! The catalog is the only source of table and column identifiers that ever
//! reach SQL. Caller-supplied names are looked up here and replaced by the
//! catalog's `&'static str`; they are never interpolated.

use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
    Number,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::Number => "number",
        }
    }

    /// Column type in the business schema.
    pub fn sql_type(&self) -> &'static str {
        match self {
            DataType::Text => "TEXT",
            DataType::Number => "BIGINT",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Backed by a business table reachable through the data gateway.
    Business,
    /// Users and roles: described in metadata for field grants only.
    Meta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub data_type: DataType,
    pub sensitive: bool,
    /// NOT NULL in the business schema; enforced on create.
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDef {
    pub name: &'static str,
    pub display_name: &'static str,
    pub kind: ResourceKind,
    pub fields: &'static [FieldDef],
}

impl ResourceDef {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        let fields: &'static [FieldDef] = self.fields;
        fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldDef> + use<> {
        let fields: &'static [FieldDef] = self.fields;
        fields.iter().filter(|f| f.required)
    }

    pub fn is_business(&self) -> bool {
        self.kind == ResourceKind::Business
    }
}

const fn text(name: &'static str) -> FieldDef {
    FieldDef { name, data_type: DataType::Text, sensitive: false, required: false }
}

const fn number(name: &'static str) -> FieldDef {
    FieldDef { name, data_type: DataType::Number, sensitive: false, required: false }
}

const fn sensitive(field: FieldDef) -> FieldDef {
    FieldDef { sensitive: true, ..field }
}

const fn required(field: FieldDef) -> FieldDef {
    FieldDef { required: true, ..field }
}

pub static CATALOG: &[ResourceDef] = &[
    ResourceDef {
        name: "employees",
        display_name: "Employees",
        kind: ResourceKind::Business,
        fields: &[
            required(text("name")),
            text("position"),
            sensitive(number("salary")),
            text("department"),
        ],
    },
    ResourceDef {
        name: "projects",
        display_name: "Projects",
        kind: ResourceKind::Business,
        fields: &[
            required(text("name")),
            text("assigned_to"),
            text("status"),
            sensitive(number("budget")),
        ],
    },
    ResourceDef {
        name: "orders",
        display_name: "Orders",
        kind: ResourceKind::Business,
        fields: &[
            required(text("customer_name")),
            number("amount"),
            text("status"),
            text("order_date"),
        ],
    },
    ResourceDef {
        name: "roles",
        display_name: "Roles",
        kind: ResourceKind::Meta,
        fields: &[text("name")],
    },
    ResourceDef {
        name: "users",
        display_name: "Users",
        kind: ResourceKind::Meta,
        fields: &[text("username"), sensitive(text("email")), text("status")],
    },
];

pub fn lookup(name: &str) -> Option<&'static ResourceDef> {
    CATALOG.iter().find(|r| r.name == name)
}

/// A resource the data gateway may touch.
pub fn business(name: &str) -> Option<&'static ResourceDef> {
    lookup(name).filter(|r| r.is_business())
}

pub fn business_resources() -> impl Iterator<Item = &'static ResourceDef> {
    CATALOG.iter().filter(|r| r.is_business())
}
