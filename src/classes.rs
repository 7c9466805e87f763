// Rylos Classes - Class Registry and Precedence Lists
//
// An explicit registry owning every class. Each class records its
// direct superclasses once; the registry computes and caches the C3
// precedence list at definition time, so dispatch never walks the
// hierarchy itself.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

use crate::conditions::LinearizationError;
use crate::types::Value;

/// Unique identifier for a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

/// Class precedence list, most specific first, ending at the root.
pub type Cpl = SmallVec<[ClassId; 8]>;

/// A class definition.
#[derive(Debug, Clone)]
pub struct Class {
    /// Class name
    pub name: String,
    /// Direct superclasses
    pub supers: SmallVec<[ClassId; 2]>,
    /// Class precedence list (computed at definition time)
    pub cpl: Cpl,
    /// Named slots declared directly on this class
    pub slots: Vec<String>,
}

/// An instance of a class.
#[derive(Debug, Clone)]
pub struct Instance {
    pub class: ClassId,
    pub slots: Vec<(String, Value)>,
}

impl Instance {
    /// Read a named slot.
    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.slots
            .iter()
            .find(|(slot_name, _)| slot_name == name)
            .map(|(_, value)| value)
    }
}

/// The class registry: owns every class and the name index.
pub struct ClassRegistry {
    classes: Vec<Class>,
    class_names: HashMap<String, ClassId>,
    /// Built-in class IDs
    pub t_class: ClassId,
    pub standard_object: ClassId,
    pub number_class: ClassId,
    pub integer_class: ClassId,
    pub float_class: ClassId,
    pub string_class: ClassId,
    pub character_class: ClassId,
    pub boolean_class: ClassId,
    pub null_class: ClassId,
    pub vector_class: ClassId,
    pub function_class: ClassId,
}

impl ClassRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            classes: Vec::new(),
            class_names: HashMap::new(),
            t_class: ClassId(0),
            standard_object: ClassId(0),
            number_class: ClassId(0),
            integer_class: ClassId(0),
            float_class: ClassId(0),
            string_class: ClassId(0),
            character_class: ClassId(0),
            boolean_class: ClassId(0),
            null_class: ClassId(0),
            vector_class: ClassId(0),
            function_class: ClassId(0),
        };

        // T class (root)
        registry.classes.push(Class {
            name: "t".to_string(),
            supers: SmallVec::new(),
            cpl: smallvec![ClassId(0)],
            slots: Vec::new(),
        });
        registry.class_names.insert("t".to_string(), ClassId(0));

        registry.standard_object = registry.bootstrap_class("standard-object", registry.t_class);
        registry.number_class = registry.bootstrap_class("number", registry.t_class);
        registry.integer_class = registry.bootstrap_class("integer", registry.number_class);
        registry.float_class = registry.bootstrap_class("float", registry.number_class);
        registry.string_class = registry.bootstrap_class("string", registry.t_class);
        registry.character_class = registry.bootstrap_class("character", registry.t_class);
        registry.boolean_class = registry.bootstrap_class("boolean", registry.t_class);
        registry.null_class = registry.bootstrap_class("null", registry.t_class);
        registry.vector_class = registry.bootstrap_class("vector", registry.t_class);
        registry.function_class = registry.bootstrap_class("function", registry.t_class);

        registry
    }

    /// Built-ins are single-inheritance, so the precedence list is the
    /// parent's list with the new class in front.
    fn bootstrap_class(&mut self, name: &str, parent: ClassId) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        let mut cpl: Cpl = smallvec![id];
        cpl.extend(self.classes[parent.0 as usize].cpl.iter().copied());
        self.classes.push(Class {
            name: name.to_string(),
            supers: smallvec![parent],
            cpl,
            slots: Vec::new(),
        });
        self.class_names.insert(name.to_string(), id);
        id
    }

    /// Define a new class. Empty supers default to standard-object;
    /// redefining an existing name keeps its id and replaces the
    /// definition in place. Precedence lists already computed for
    /// subclasses are not revisited.
    pub fn define_class(
        &mut self,
        name: &str,
        supers: &[ClassId],
        slots: &[&str],
    ) -> Result<ClassId, LinearizationError> {
        let supers: SmallVec<[ClassId; 2]> = if supers.is_empty() {
            smallvec![self.standard_object]
        } else {
            supers.iter().copied().collect()
        };

        let existing = self.class_names.get(name).copied();
        let id = existing.unwrap_or(ClassId(self.classes.len() as u32));

        let cpl = self.linearize(id, name, &supers)?;

        let class = Class {
            name: name.to_string(),
            supers,
            cpl,
            slots: slots.iter().map(|s| s.to_string()).collect(),
        };

        match existing {
            Some(existing_id) => self.classes[existing_id.0 as usize] = class,
            None => {
                self.classes.push(class);
                self.class_names.insert(name.to_string(), id);
            }
        }

        Ok(id)
    }

    /// C3 linearization: the class itself, then the merge of its
    /// superclasses' precedence lists and the direct-superclass order.
    fn linearize(
        &self,
        id: ClassId,
        name: &str,
        supers: &[ClassId],
    ) -> Result<Cpl, LinearizationError> {
        let mut sequences: Vec<Vec<ClassId>> = Vec::with_capacity(supers.len() + 1);
        for &super_id in supers {
            if let Some(super_class) = self.classes.get(super_id.0 as usize) {
                sequences.push(super_class.cpl.iter().copied().collect());
            }
        }
        sequences.push(supers.to_vec());

        let mut cpl: Cpl = smallvec![id];
        loop {
            sequences.retain(|seq| !seq.is_empty());
            if sequences.is_empty() {
                return Ok(cpl);
            }

            // A head is good when no other sequence holds it in a tail.
            let candidate = sequences
                .iter()
                .map(|seq| seq[0])
                .find(|&head| !sequences.iter().any(|seq| seq[1..].contains(&head)));

            match candidate {
                // A head already in the list means the superclass
                // graph loops back through this class.
                Some(next) if cpl.contains(&next) => {
                    return Err(LinearizationError {
                        class: name.to_string(),
                    })
                }
                Some(next) => {
                    cpl.push(next);
                    for seq in sequences.iter_mut() {
                        seq.retain(|&c| c != next);
                    }
                }
                None => {
                    return Err(LinearizationError {
                        class: name.to_string(),
                    })
                }
            }
        }
    }

    /// Find class by name.
    pub fn find_class(&self, name: &str) -> Option<ClassId> {
        self.class_names.get(name).copied()
    }

    /// Get class by ID.
    pub fn get_class(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(id.0 as usize)
    }

    /// Class name for diagnostics.
    pub fn class_name(&self, id: ClassId) -> &str {
        self.get_class(id)
            .map(|c| c.name.as_str())
            .unwrap_or("#<unknown-class>")
    }

    /// Cached precedence list, most specific first.
    pub fn cpl(&self, id: ClassId) -> &[ClassId] {
        self.get_class(id).map(|c| c.cpl.as_slice()).unwrap_or(&[])
    }

    /// True when a is b or a descendant of b.
    pub fn is_subclass(&self, a: ClassId, b: ClassId) -> bool {
        self.cpl(a).contains(&b)
    }

    /// The class of a runtime value.
    pub fn class_of(&self, value: &Value) -> ClassId {
        match value {
            Value::Nil => self.null_class,
            Value::Bool(_) => self.boolean_class,
            Value::Int(_) | Value::BigInt(_) => self.integer_class,
            Value::Float(_) => self.float_class,
            Value::Char(_) => self.character_class,
            Value::Str(_) => self.string_class,
            Value::Vector(_) => self.vector_class,
            Value::Function(_) => self.function_class,
            Value::Instance(inst) => inst.class,
        }
    }

    /// Create an instance. Slots declared anywhere on the precedence
    /// list are gathered most specific first; values come from the
    /// given pairs, defaulting to nil.
    pub fn make_instance(
        &self,
        class_id: ClassId,
        slot_values: &[(&str, Value)],
    ) -> Option<Arc<Instance>> {
        let class = self.get_class(class_id)?;
        let mut slots: Vec<(String, Value)> = Vec::new();
        for &ancestor in &class.cpl {
            if let Some(ancestor_class) = self.get_class(ancestor) {
                for slot_name in &ancestor_class.slots {
                    if slots.iter().all(|(existing, _)| existing != slot_name) {
                        let value = slot_values
                            .iter()
                            .find(|(name, _)| name == slot_name)
                            .map(|(_, value)| value.clone())
                            .unwrap_or(Value::Nil);
                        slots.push((slot_name.clone(), value));
                    }
                }
            }
        }
        Some(Arc::new(Instance {
            class: class_id,
            slots,
        }))
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
