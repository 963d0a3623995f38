//! Element definitions and the recipe table.
//!
//! This module provides:
//! - Element data (base elements and two-ingredient composites)
//! - Validation of element definitions (counts, references, cycles, ambiguity)
//! - Order-independent recipe lookup by ingredient pair
//! - Enumeration of base elements in load order

use ahash::AHashMap;
use elemental_common::{ConfigError, ElementId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// Element Definitions
// ============================================================================

/// An element as declared in data, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDefinition {
    /// Unique element identifier.
    pub id: u32,
    /// Unique element name.
    pub name: String,
    /// Name shown on the token face (defaults to `name`).
    #[serde(default)]
    pub display_name: Option<String>,
    /// Ingredient references, by element name or numeric id.
    #[serde(default)]
    pub ingredients: Vec<String>,
}

impl ElementDefinition {
    /// Defines a base element.
    #[must_use]
    pub fn base(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            display_name: None,
            ingredients: Vec::new(),
        }
    }

    /// Defines an element made from two ingredients.
    #[must_use]
    pub fn composite(
        id: u32,
        name: impl Into<String>,
        a: impl Into<String>,
        b: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            display_name: None,
            ingredients: vec![a.into(), b.into()],
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// A loaded, validated element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    id: ElementId,
    name: String,
    display_name: String,
    ingredients: Option<[ElementId; 2]>,
}

impl Element {
    /// Element identifier.
    #[must_use]
    pub const fn id(&self) -> ElementId {
        self.id
    }

    /// Unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name shown on the token face.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Ingredient pair, `None` for base elements.
    #[must_use]
    pub const fn ingredients(&self) -> Option<[ElementId; 2]> {
        self.ingredients
    }

    /// Whether this element has no ingredients.
    #[must_use]
    pub const fn is_base(&self) -> bool {
        self.ingredients.is_none()
    }
}

// ============================================================================
// Pair Keys
// ============================================================================

/// Unordered ingredient pair, stored sorted so `(a, b)` and `(b, a)` are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(ElementId, ElementId);

impl PairKey {
    /// Builds the key for an unordered pair.
    #[must_use]
    pub fn new(a: ElementId, b: ElementId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    /// The pair members, smaller id first.
    #[must_use]
    pub const fn members(self) -> (ElementId, ElementId) {
        (self.0, self.1)
    }
}

// ============================================================================
// Recipe Table
// ============================================================================

/// Immutable element table with recipe lookup.
#[derive(Debug, Clone, Default)]
pub struct RecipeTable {
    /// Elements in load order.
    elements: Vec<Element>,
    /// Index into `elements` by id.
    by_id: AHashMap<ElementId, usize>,
    /// Element ids by lowercase name.
    by_name: AHashMap<String, ElementId>,
    /// Recipe results by ingredient pair.
    by_pair: AHashMap<PairKey, ElementId>,
}

/// Visit state for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

impl RecipeTable {
    /// Starts a table built in code, in load order.
    #[must_use]
    pub fn builder() -> RecipeTableBuilder {
        RecipeTableBuilder::default()
    }

    /// Validates definitions and builds the table.
    pub fn load(
        definitions: impl IntoIterator<Item = ElementDefinition>,
    ) -> Result<Self, ConfigError> {
        let definitions: Vec<ElementDefinition> = definitions.into_iter().collect();
        let mut table = Self::default();

        // Identity pass: ids, names, ingredient counts
        for def in &definitions {
            if def.name.trim().is_empty() {
                return Err(ConfigError::EmptyName { id: def.id });
            }
            let id = ElementId::new(def.id);
            if table.by_id.contains_key(&id) {
                return Err(ConfigError::DuplicateId(def.id));
            }
            let key = def.name.to_lowercase();
            if table.by_name.contains_key(&key) {
                return Err(ConfigError::DuplicateName(def.name.clone()));
            }
            if !matches!(def.ingredients.len(), 0 | 2) {
                return Err(ConfigError::IngredientCount {
                    name: def.name.clone(),
                    count: def.ingredients.len(),
                });
            }

            table.by_id.insert(id, table.elements.len());
            table.by_name.insert(key, id);
            table.elements.push(Element {
                id,
                name: def.name.clone(),
                display_name: def.display_name.clone().unwrap_or_else(|| def.name.clone()),
                ingredients: None,
            });
        }

        // Reference pass
        for (index, def) in definitions.iter().enumerate() {
            if let [a, b] = def.ingredients.as_slice() {
                let a = table.resolve_reference(&def.name, a)?;
                let b = table.resolve_reference(&def.name, b)?;
                table.elements[index].ingredients = Some([a, b]);
            }
        }

        table.check_cycles()?;

        // Reverse index
        for element in &table.elements {
            let Some([a, b]) = element.ingredients else {
                continue;
            };
            let key = PairKey::new(a, b);
            if let Some(existing) = table.by_pair.get(&key) {
                return Err(ConfigError::AmbiguousRecipe {
                    first: table.name_of(*existing),
                    second: element.name.clone(),
                    a: table.name_of(a),
                    b: table.name_of(b),
                });
            }
            debug!(
                "Recipe: {} + {} = {}",
                table.name_of(a),
                table.name_of(b),
                element.name
            );
            table.by_pair.insert(key, element.id);
        }

        info!(
            "Loaded {} elements ({} base, {} recipes)",
            table.elements.len(),
            table.base_elements().count(),
            table.by_pair.len()
        );

        Ok(table)
    }

    /// Looks up an ingredient reference by name first, then by numeric id.
    fn resolve_reference(&self, element: &str, reference: &str) -> Result<ElementId, ConfigError> {
        if let Some(id) = self.by_name.get(&reference.trim().to_lowercase()) {
            return Ok(*id);
        }
        reference
            .trim()
            .parse::<u32>()
            .ok()
            .map(ElementId::new)
            .filter(|id| self.by_id.contains_key(id))
            .ok_or_else(|| ConfigError::UnresolvedIngredient {
                element: element.to_string(),
                ingredient: reference.to_string(),
            })
    }

    /// Rejects any cycle in the ingredient graph, including self-reference.
    fn check_cycles(&self) -> Result<(), ConfigError> {
        let mut state = vec![Visit::New; self.elements.len()];

        for root in 0..self.elements.len() {
            if state[root] != Visit::New {
                continue;
            }
            // Iterative depth-first walk: (element index, next ingredient slot)
            let mut stack = vec![(root, 0usize)];
            state[root] = Visit::Active;

            while let Some((index, slot)) = stack.last_mut() {
                let current = *index;
                let next = self.elements[current]
                    .ingredients
                    .and_then(|pair| pair.get(*slot).copied());
                *slot += 1;

                let Some(child_id) = next else {
                    state[current] = Visit::Done;
                    stack.pop();
                    continue;
                };
                let child = self.by_id[&child_id];
                match state[child] {
                    Visit::Active => {
                        return Err(ConfigError::Cycle(self.elements[child].name.clone()));
                    },
                    Visit::New => {
                        state[child] = Visit::Active;
                        stack.push((child, 0));
                    },
                    Visit::Done => {},
                }
            }
        }

        Ok(())
    }

    fn name_of(&self, id: ElementId) -> String {
        self.get(id)
            .map_or_else(|| id.to_string(), |e| e.name.clone())
    }

    /// Resolves an unordered pair to its recipe result.
    #[must_use]
    pub fn resolve(&self, a: ElementId, b: ElementId) -> Option<&Element> {
        self.by_pair
            .get(&PairKey::new(a, b))
            .and_then(|id| self.get(*id))
    }

    /// Order-independent key used for recipe lookup.
    #[must_use]
    pub fn pair_key(a: &Element, b: &Element) -> PairKey {
        PairKey::new(a.id, b.id)
    }

    /// All elements without ingredients, in load order.
    pub fn base_elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.is_base())
    }

    /// Elements that use `id` as one of their ingredients, in load order.
    #[must_use]
    pub fn recipes_using(&self, id: ElementId) -> Vec<&Element> {
        self.elements
            .iter()
            .filter(|e| e.ingredients.is_some_and(|pair| pair.contains(&id)))
            .collect()
    }

    /// Gets an element by id.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.by_id.get(&id).map(|index| &self.elements[*index])
    }

    /// Gets an element by name (case-insensitive).
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Element> {
        self.by_name
            .get(&name.to_lowercase())
            .and_then(|id| self.get(*id))
    }

    /// All elements in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the table holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of recipes (composite elements).
    #[must_use]
    pub fn recipe_count(&self) -> usize {
        self.by_pair.len()
    }
}

/// Builder for a [`RecipeTable`] assembled in code.
#[derive(Debug, Default)]
pub struct RecipeTableBuilder {
    definitions: Vec<ElementDefinition>,
}

impl RecipeTableBuilder {
    /// Adds a base element.
    #[must_use]
    pub fn base(mut self, id: u32, name: impl Into<String>) -> Self {
        self.definitions.push(ElementDefinition::base(id, name));
        self
    }

    /// Adds an element made from two ingredients, referenced by name.
    #[must_use]
    pub fn combine(
        mut self,
        id: u32,
        name: impl Into<String>,
        a: impl Into<String>,
        b: impl Into<String>,
    ) -> Self {
        self.definitions
            .push(ElementDefinition::composite(id, name, a, b));
        self
    }

    /// Adds a raw definition.
    #[must_use]
    pub fn definition(mut self, definition: ElementDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Validates and builds the table.
    pub fn build(self) -> Result<RecipeTable, ConfigError> {
        RecipeTable::load(self.definitions)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn classic() -> RecipeTable {
        RecipeTable::builder()
            .base(1, "Water")
            .base(2, "Earth")
            .base(3, "Fire")
            .base(4, "Air")
            .combine(5, "Mud", "Water", "Earth")
            .combine(6, "Steam", "Water", "Fire")
            .combine(7, "Lava", "Earth", "Fire")
            .combine(8, "Brick", "Mud", "Fire")
            .build()
            .expect("classic table is valid")
    }

    fn id(raw: u32) -> ElementId {
        ElementId::new(raw)
    }

    #[test]
    fn test_resolve_hit_and_miss() {
        let table = classic();
        let mud = table.resolve(id(1), id(2)).expect("mud");
        assert_eq!(mud.name(), "Mud");
        assert!(table.resolve(id(1), id(4)).is_none());
        assert!(table.resolve(id(1), id(99)).is_none());
    }

    #[test]
    fn test_resolve_is_symmetric() {
        let table = classic();
        for a in table.iter() {
            for b in table.iter() {
                assert_eq!(
                    table.resolve(a.id(), b.id()).map(Element::id),
                    table.resolve(b.id(), a.id()).map(Element::id)
                );
            }
        }
    }

    #[test]
    fn test_pair_key_order_independent() {
        assert_eq!(PairKey::new(id(7), id(3)), PairKey::new(id(3), id(7)));
        assert_eq!(PairKey::new(id(7), id(3)).members(), (id(3), id(7)));
        // Sums collide, keys do not
        assert_ne!(PairKey::new(id(1), id(4)), PairKey::new(id(2), id(3)));
    }

    #[test]
    fn test_pair_key_of_loaded_elements() {
        let table = classic();
        let water = table.by_name("Water").expect("water");
        let earth = table.by_name("Earth").expect("earth");
        let fire = table.by_name("Fire").expect("fire");

        let key = RecipeTable::pair_key(water, earth);
        assert_eq!(key, RecipeTable::pair_key(earth, water));
        assert_eq!(key.members(), (water.id(), earth.id()));
        assert_ne!(key, RecipeTable::pair_key(water, fire));
        assert_eq!(
            RecipeTable::pair_key(water, water),
            PairKey::new(water.id(), water.id())
        );
    }

    #[test]
    fn test_base_elements_in_load_order() {
        let table = classic();
        let names: Vec<_> = table.base_elements().map(Element::name).collect();
        assert_eq!(names, vec!["Water", "Earth", "Fire", "Air"]);
    }

    #[test]
    fn test_lookup_by_name_case_insensitive() {
        let table = classic();
        assert_eq!(table.by_name("mud").map(Element::id), Some(id(5)));
        assert_eq!(table.by_name("STEAM").map(Element::id), Some(id(6)));
        assert!(table.by_name("Plasma").is_none());
    }

    #[test]
    fn test_ingredients_by_numeric_id() {
        let table = RecipeTable::builder()
            .base(10, "Water")
            .base(20, "Earth")
            .combine(30, "Mud", "10", "20")
            .build()
            .expect("valid");
        assert_eq!(table.resolve(id(20), id(10)).map(Element::name), Some("Mud"));
    }

    #[test]
    fn test_recipes_using() {
        let table = classic();
        let names: Vec<_> = table.recipes_using(id(3)).into_iter().map(Element::name).collect();
        assert_eq!(names, vec!["Steam", "Lava", "Brick"]);
    }

    #[test]
    fn test_display_name_defaults_to_name() {
        let table = RecipeTable::builder()
            .base(1, "Water")
            .definition(ElementDefinition::base(2, "Earth").with_display_name("Soil"))
            .build()
            .expect("valid");
        assert_eq!(table.get(id(1)).map(Element::display_name), Some("Water"));
        assert_eq!(table.get(id(2)).map(Element::display_name), Some("Soil"));
    }

    #[test]
    fn test_same_ingredient_twice_allowed() {
        let table = RecipeTable::builder()
            .base(1, "Air")
            .combine(2, "Wind", "Air", "Air")
            .build()
            .expect("valid");
        assert_eq!(table.resolve(id(1), id(1)).map(Element::name), Some("Wind"));
    }

    #[test]
    fn test_wrong_ingredient_count() {
        let result = RecipeTable::builder()
            .base(1, "Water")
            .definition(ElementDefinition {
                id: 2,
                name: "Puddle".to_string(),
                display_name: None,
                ingredients: vec!["Water".to_string()],
            })
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::IngredientCount { count: 1, .. })
        ));
    }

    #[test]
    fn test_unresolved_ingredient() {
        let result = RecipeTable::builder()
            .base(1, "Water")
            .combine(2, "Mud", "Water", "Earth")
            .build();
        assert_eq!(
            result.err(),
            Some(ConfigError::UnresolvedIngredient {
                element: "Mud".to_string(),
                ingredient: "Earth".to_string(),
            })
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let result = RecipeTable::builder()
            .base(1, "Water")
            .combine(2, "A", "B", "Water")
            .combine(3, "B", "A", "Water")
            .build();
        assert!(matches!(result, Err(ConfigError::Cycle(_))));
    }

    #[test]
    fn test_self_reference_rejected() {
        let result = RecipeTable::builder()
            .base(1, "Water")
            .combine(2, "Ouroboros", "Ouroboros", "Water")
            .build();
        assert_eq!(result.err(), Some(ConfigError::Cycle("Ouroboros".to_string())));
    }

    #[test]
    fn test_ambiguous_recipe_rejected() {
        let result = RecipeTable::builder()
            .base(1, "Water")
            .base(2, "Earth")
            .combine(3, "Mud", "Water", "Earth")
            .combine(4, "Clay", "Earth", "Water")
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::AmbiguousRecipe { ref first, ref second, .. })
                if first == "Mud" && second == "Clay"
        ));
    }

    #[test]
    fn test_duplicates_rejected() {
        let dup_id = RecipeTable::builder().base(1, "Water").base(1, "Earth").build();
        assert_eq!(dup_id.err(), Some(ConfigError::DuplicateId(1)));

        let dup_name = RecipeTable::builder().base(1, "Water").base(2, "water").build();
        assert_eq!(dup_name.err(), Some(ConfigError::DuplicateName("water".to_string())));

        let empty = RecipeTable::builder().base(1, "  ").build();
        assert_eq!(empty.err(), Some(ConfigError::EmptyName { id: 1 }));
    }

    #[test]
    fn test_counts() {
        let table = classic();
        assert_eq!(table.len(), 8);
        assert_eq!(table.recipe_count(), 4);
        assert!(!table.is_empty());
        assert!(RecipeTable::default().is_empty());
    }
}
