use std::f64::consts;
use std::sync::Arc;

/// A named physical or mathematical constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecialConstant {
    name: &'static str,
    value: f64,
}

const fn special(name: &'static str, value: f64) -> SpecialConstant {
    SpecialConstant { name, value }
}

pub const SPECIAL_CONSTANTS: [SpecialConstant; 17] = [
    special("pi", consts::PI),
    special("e", consts::E),
    special("_180", 180.0),
    special("_10", 10.0),
    special("_2", 2.0),
    special("_1", 1.0),
    // absolute zero
    special("t0", -273.15),
    // Boltzmann
    special("k", 1.380649e-23),
    // Planck
    special("h", 6.62607015e-34),
    // speed of light
    special("c", 299792458.0),
    // elementary charge
    special("q_e", 1.602176634e-19),
    // caesium standard
    special("f_cs", 9192631770.0),
    // Avogadro
    special("L", 6.02214076e23),
    // Bohr radius
    special("a0", 5.29177210903e-11),
    // fine-structure
    special("alpha", 0.0072973525693),
    // electron mass
    special("m_e", 9.1093837015e-31),
    // proton mass
    special("m_p", 1.67262192369e-27),
];

impl SpecialConstant {
    pub fn by_name(name: &str) -> Option<Self> {
        SPECIAL_CONSTANTS.into_iter().find(|c| c.name == name)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// One value per group label; the labels are kept sorted so lookups can binary search.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupConstant {
    groups: Arc<[String]>,
    values: Vec<f64>,
}

impl GroupConstant {
    /// All groups start out with the same value.
    pub fn uniform(groups: Arc<[String]>, value: f64) -> Self {
        let values = vec![value; groups.len()];
        Self { groups, values }
    }

    /// Builds a group constant from `(label, value)` pairs in any order.
    pub fn from_pairs(mut pairs: Vec<(String, f64)>) -> Self {
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let (groups, values): (Vec<String>, Vec<f64>) = pairs.into_iter().unzip();
        Self {
            groups: groups.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_for(&self, group: &str) -> Option<f64> {
        self.groups
            .binary_search_by(|g| g.as_str().cmp(group))
            .ok()
            .map(|index| self.values[index])
    }

    pub fn value_at(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// Copy with the value at `index` replaced; the label list is shared.
    pub fn with_value(&self, index: usize, value: f64) -> Self {
        let mut values = self.values.clone();
        values[index] = value;
        Self {
            groups: Arc::clone(&self.groups),
            values,
        }
    }

    /// The common value if every group holds the same one.
    pub fn uniform_value(&self) -> Option<f64> {
        let first = *self.values.first()?;
        self.values.iter().all(|v| *v == first).then_some(first)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.groups
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}
