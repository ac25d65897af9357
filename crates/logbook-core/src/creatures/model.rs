use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatureAttributes {
    pub intelligence: u32,
    pub strength: u32,
    pub endurance: u32,
}

impl CreatureAttributes {
    pub fn new(intelligence: u32, strength: u32, endurance: u32) -> Self {
        Self {
            intelligence,
            strength,
            endurance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Creature {
    pub attributes: CreatureAttributes,
    pub hit_points: u32,
    pub name: String,
    /// Avatar image id; 0 means none chosen.
    pub drawable: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CreatureGenerator;

impl CreatureGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, attributes: CreatureAttributes, name: &str, drawable: u32) -> Creature {
        let hit_points =
            5 * attributes.intelligence + 3 * attributes.strength + 4 * attributes.endurance;
        Creature {
            attributes,
            hit_points,
            name: name.to_string(),
            drawable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeValue {
    pub label: &'static str,
    pub value: u32,
}

const fn attr(label: &'static str, value: u32) -> AttributeValue {
    AttributeValue { label, value }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Intelligence,
    Strength,
    Endurance,
}

pub const INTELLIGENCE: [AttributeValue; 4] = [
    attr("Select intelligence", 0),
    attr("Dim", 3),
    attr("Sharp", 7),
    attr("Genius", 10),
];

pub const STRENGTH: [AttributeValue; 4] = [
    attr("Select strength", 0),
    attr("Feeble", 3),
    attr("Sturdy", 7),
    attr("Mighty", 10),
];

pub const ENDURANCE: [AttributeValue; 4] = [
    attr("Select endurance", 0),
    attr("Fragile", 3),
    attr("Tough", 7),
    attr("Unbreakable", 10),
];

impl Attribute {
    pub fn table(self) -> &'static [AttributeValue] {
        match self {
            Attribute::Intelligence => &INTELLIGENCE,
            Attribute::Strength => &STRENGTH,
            Attribute::Endurance => &ENDURANCE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Intelligence => "intelligence",
            Attribute::Strength => "strength",
            Attribute::Endurance => "endurance",
        }
    }

    /// Value selected by a picker index.
    pub fn value_at(self, index: usize) -> Result<u32, String> {
        self.table()
            .get(index)
            .map(|entry| entry.value)
            .ok_or_else(|| format!("no {} value at index {index}", self.name()))
    }
}
