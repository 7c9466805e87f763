// Rylos Generic Functions - Registration and Dispatch
//
// A generic function owns one dispatch trie. Registration descends it
// once per specializer, creating nodes on demand; invocation descends
// it once per runtime argument, trying exact value, then the
// argument's class chain most specific first, then the default branch.

use tracing::warn;

use crate::classes::{ClassId, ClassRegistry};
use crate::conditions::{GenericError, RedefinitionWarning, UndispatchedArgument};
use crate::trie::DispatchNode;
use crate::types::{EqlKey, Value};

/// Per-parameter dispatch criterion, most to least specific: an eql
/// match on a literal value, a class (or descendant) match, or the
/// unconditional default.
#[derive(Debug, Clone)]
pub enum Specializer {
    Default,
    Class(ClassId),
    Eql(Value),
}

/// Host-supplied sink for redefinition notices.
pub type WarningHandler = Box<dyn Fn(&RedefinitionWarning) + Send + Sync>;

/// A validated registration step: eql values already projected to
/// their keys, so the trie walk itself cannot fail.
enum Step {
    Default,
    Class(ClassId),
    Value(EqlKey),
}

/// A generic function: a name, a dispatch trie, and the redefinition
/// policy. Implementations are plain callable values; selection is by
/// the runtime classes and values of the positional arguments.
pub struct GenericFunction {
    name: String,
    doc: String,
    root: DispatchNode,
    warn_on_redefinition: bool,
    warning_handler: Option<WarningHandler>,
}

impl GenericFunction {
    /// New generic function that warns when a registration displaces
    /// an earlier implementation.
    pub fn new(name: &str, doc: &str) -> Self {
        Self::with_options(name, doc, true)
    }

    /// New generic function with an explicit redefinition policy.
    pub fn with_options(name: &str, doc: &str, warn_on_redefinition: bool) -> Self {
        Self {
            name: name.to_string(),
            doc: doc.to_string(),
            root: DispatchNode::new(),
            warn_on_redefinition,
            warning_handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// Route redefinition notices to the host instead of the log.
    pub fn set_warning_handler<F>(&mut self, handler: F)
    where
        F: Fn(&RedefinitionWarning) + Send + Sync + 'static,
    {
        self.warning_handler = Some(Box::new(handler));
    }

    /// Register an implementation under a specializer sequence. The
    /// target must be callable and every eql value must be usable as a
    /// key; both are checked before the trie is touched, so a failed
    /// registration leaves no partial path behind.
    pub fn register(
        &mut self,
        classes: &ClassRegistry,
        specializers: &[Specializer],
        implementation: Value,
    ) -> Result<(), GenericError> {
        let implementation = match implementation {
            Value::Function(f) => f,
            other => {
                return Err(GenericError::InvalidImplementation {
                    generic: self.name.clone(),
                    found: other.to_string(),
                })
            }
        };

        let mut steps: Vec<Step> = Vec::with_capacity(specializers.len());
        for spec in specializers {
            match spec {
                Specializer::Default => steps.push(Step::Default),
                Specializer::Class(class) => steps.push(Step::Class(*class)),
                Specializer::Eql(value) => match EqlKey::of(value) {
                    Ok(key) => steps.push(Step::Value(key)),
                    Err(reason) => {
                        return Err(GenericError::NotComparable {
                            generic: self.name.clone(),
                            value: value.to_string(),
                            reason: reason.to_string(),
                        })
                    }
                },
            }
        }

        let mut node = &mut self.root;
        for step in steps {
            node = match step {
                Step::Default => node.default_child_or_insert(),
                Step::Class(class) => node.class_child_or_insert(class),
                Step::Value(key) => node.value_child_or_insert(key),
            };
        }

        if node.set_terminal(implementation).is_some() && self.warn_on_redefinition {
            let warning = RedefinitionWarning {
                generic: self.name.clone(),
                signature: describe_specializers(classes, specializers),
            };
            match &self.warning_handler {
                Some(handler) => handler(&warning),
                None => warn!("{}", warning),
            }
        }

        Ok(())
    }

    /// Call the generic function on positional arguments.
    pub fn invoke(&self, classes: &ClassRegistry, args: &[Value]) -> Result<Value, GenericError> {
        self.invoke_with_keywords(classes, args, &[])
    }

    /// Call form that carries keyword arguments. Generic calls do not
    /// accept keywords; a non-empty list fails before any dispatch,
    /// even when the positional arguments alone would match.
    pub fn invoke_with_keywords(
        &self,
        classes: &ClassRegistry,
        args: &[Value],
        keywords: &[(String, Value)],
    ) -> Result<Value, GenericError> {
        if !keywords.is_empty() {
            let names: Vec<&str> = keywords.iter().map(|(name, _)| name.as_str()).collect();
            return Err(GenericError::KeywordArguments {
                generic: self.name.clone(),
                keywords: names.join(", "),
            });
        }

        let mut node = &self.root;
        for (position, arg) in args.iter().enumerate() {
            node = resolve_step(classes, node, arg).ok_or_else(|| {
                GenericError::NoApplicableMethod {
                    generic: self.name.clone(),
                    argument: Some(UndispatchedArgument {
                        position,
                        class: classes.class_name(classes.class_of(arg)).to_string(),
                        value: arg.to_string(),
                    }),
                }
            })?;
        }

        match node.terminal() {
            Some(implementation) => implementation(args),
            None => Err(GenericError::NoApplicableMethod {
                generic: self.name.clone(),
                argument: None,
            }),
        }
    }
}

/// One argument step: exact value first, then the argument's cached
/// precedence list most specific first, then the default branch.
/// Arguments with no key skip the value step rather than erroring.
fn resolve_step<'a>(
    classes: &ClassRegistry,
    node: &'a DispatchNode,
    arg: &Value,
) -> Option<&'a DispatchNode> {
    if let Ok(key) = EqlKey::of(arg) {
        if let Some(child) = node.value_child(&key) {
            return Some(child);
        }
    }

    for &ancestor in classes.cpl(classes.class_of(arg)) {
        if let Some(child) = node.class_child(ancestor) {
            return Some(child);
        }
    }

    node.default_child()
}

/// CL-style rendering of a specializer sequence, e.g.
/// `(rectangle t (eql 0))`.
pub fn describe_specializers(classes: &ClassRegistry, specializers: &[Specializer]) -> String {
    let mut out = String::from("(");
    for (i, spec) in specializers.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        match spec {
            Specializer::Default => out.push('t'),
            Specializer::Class(id) => out.push_str(classes.class_name(*id)),
            Specializer::Eql(value) => {
                out.push_str("(eql ");
                out.push_str(&value.to_string());
                out.push(')');
            }
        }
    }
    out.push(')');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn tag(text: &str) -> Value {
        let text = text.to_string();
        Value::function(move |_args| Ok(Value::string(&text)))
    }

    #[test]
    fn test_class_dispatch_walks_ancestors() {
        let classes = ClassRegistry::new();
        let mut describe = GenericFunction::new("describe", "");

        describe
            .register(
                &classes,
                &[Specializer::Class(classes.number_class)],
                tag("number"),
            )
            .unwrap();

        // Both numeric builtins reach the number branch.
        assert_eq!(
            describe.invoke(&classes, &[Value::Int(3)]).unwrap(),
            Value::string("number")
        );
        assert_eq!(
            describe.invoke(&classes, &[Value::Float(3.5)]).unwrap(),
            Value::string("number")
        );

        // A more specific branch wins once registered.
        describe
            .register(
                &classes,
                &[Specializer::Class(classes.integer_class)],
                tag("integer"),
            )
            .unwrap();
        assert_eq!(
            describe.invoke(&classes, &[Value::Int(3)]).unwrap(),
            Value::string("integer")
        );
        assert_eq!(
            describe.invoke(&classes, &[Value::Float(3.5)]).unwrap(),
            Value::string("number")
        );
    }

    #[test]
    fn test_value_match_beats_class_match() {
        let classes = ClassRegistry::new();
        let mut describe = GenericFunction::new("describe", "");

        describe
            .register(
                &classes,
                &[Specializer::Class(classes.integer_class)],
                tag("integer"),
            )
            .unwrap();
        describe
            .register(&classes, &[Specializer::Eql(Value::Int(0))], tag("zero"))
            .unwrap();

        assert_eq!(
            describe.invoke(&classes, &[Value::Int(0)]).unwrap(),
            Value::string("zero")
        );
        assert_eq!(
            describe.invoke(&classes, &[Value::Int(3)]).unwrap(),
            Value::string("integer")
        );
        // Cross-representation arguments land on the same key.
        assert_eq!(
            describe.invoke(&classes, &[Value::Float(0.0)]).unwrap(),
            Value::string("zero")
        );
    }

    #[test]
    fn test_default_branch_is_last_resort() {
        let classes = ClassRegistry::new();
        let mut describe = GenericFunction::new("describe", "");

        describe
            .register(&classes, &[Specializer::Default], tag("anything"))
            .unwrap();
        describe
            .register(
                &classes,
                &[Specializer::Class(classes.string_class)],
                tag("string"),
            )
            .unwrap();

        assert_eq!(
            describe.invoke(&classes, &[Value::string("x")]).unwrap(),
            Value::string("string")
        );
        assert_eq!(
            describe.invoke(&classes, &[Value::Int(1)]).unwrap(),
            Value::string("anything")
        );
    }

    #[test]
    fn test_invalid_implementation_leaves_trie_untouched() {
        let classes = ClassRegistry::new();
        let mut area = GenericFunction::new("area", "");

        let err = area
            .register(
                &classes,
                &[Specializer::Class(classes.integer_class)],
                Value::Int(42),
            )
            .unwrap_err();
        assert!(matches!(err, GenericError::InvalidImplementation { .. }));

        let err = area.invoke(&classes, &[Value::Int(1)]).unwrap_err();
        assert!(matches!(err, GenericError::NoApplicableMethod { .. }));
    }

    #[test]
    fn test_bad_eql_value_leaves_no_partial_path() {
        let classes = ClassRegistry::new();

        let bad_values = [
            Value::Float(f64::NAN),
            Value::vector(vec![]),
            Value::function(|_| Ok(Value::Nil)),
        ];
        for bad in bad_values {
            let mut area = GenericFunction::new("area", "");
            let err = area
                .register(
                    &classes,
                    &[
                        Specializer::Class(classes.float_class),
                        Specializer::Eql(bad),
                    ],
                    tag("never"),
                )
                .unwrap_err();
            assert!(matches!(err, GenericError::NotComparable { .. }));

            // The class step ahead of the bad value was never created.
            assert!(area.root.is_empty());
            let err = area.invoke(&classes, &[Value::Float(1.0)]).unwrap_err();
            assert!(matches!(
                err,
                GenericError::NoApplicableMethod {
                    argument: Some(_),
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_redefinition_warning_via_handler() {
        let classes = ClassRegistry::new();
        let mut area = GenericFunction::new("area", "");

        let warnings = Arc::new(Mutex::new(Vec::new()));
        let sink = warnings.clone();
        area.set_warning_handler(move |warning| sink.lock().unwrap().push(warning.clone()));

        let spec = [Specializer::Class(classes.integer_class)];
        area.register(&classes, &spec, tag("first")).unwrap();
        assert!(warnings.lock().unwrap().is_empty());

        area.register(&classes, &spec, tag("second")).unwrap();
        {
            let seen = warnings.lock().unwrap();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].generic, "area");
            assert_eq!(seen[0].signature, "(integer)");
        }

        // The overwrite itself always proceeds.
        assert_eq!(
            area.invoke(&classes, &[Value::Int(1)]).unwrap(),
            Value::string("second")
        );
    }

    #[test]
    fn test_redefinition_warning_suppressed() {
        let classes = ClassRegistry::new();
        let mut area = GenericFunction::with_options("area", "", false);

        let warnings = Arc::new(Mutex::new(Vec::new()));
        let sink = warnings.clone();
        area.set_warning_handler(move |warning| sink.lock().unwrap().push(warning.clone()));

        let spec = [Specializer::Class(classes.integer_class)];
        area.register(&classes, &spec, tag("first")).unwrap();
        area.register(&classes, &spec, tag("second")).unwrap();
        assert!(warnings.lock().unwrap().is_empty());
        assert_eq!(
            area.invoke(&classes, &[Value::Int(1)]).unwrap(),
            Value::string("second")
        );
    }

    #[test]
    fn test_keyword_arguments_rejected() {
        let classes = ClassRegistry::new();
        let mut area = GenericFunction::new("area", "");
        area.register(&classes, &[Specializer::Default], tag("anything"))
            .unwrap();

        let err = area
            .invoke_with_keywords(
                &classes,
                &[Value::Int(1)],
                &[("color".to_string(), Value::string("red"))],
            )
            .unwrap_err();
        assert!(matches!(err, GenericError::KeywordArguments { .. }));

        // The same positional call succeeds without keywords.
        assert!(area.invoke(&classes, &[Value::Int(1)]).is_ok());
    }

    #[test]
    fn test_matched_path_without_terminal() {
        let classes = ClassRegistry::new();
        let mut combine = GenericFunction::new("combine", "");
        combine
            .register(
                &classes,
                &[
                    Specializer::Class(classes.integer_class),
                    Specializer::Class(classes.integer_class),
                ],
                tag("pair"),
            )
            .unwrap();

        let err = combine.invoke(&classes, &[Value::Int(1)]).unwrap_err();
        assert!(matches!(
            err,
            GenericError::NoApplicableMethod { argument: None, .. }
        ));
    }

    #[test]
    fn test_describe_specializers_rendering() {
        let mut classes = ClassRegistry::new();
        let rectangle = classes.define_class("rectangle", &[], &[]).unwrap();

        let rendered = describe_specializers(
            &classes,
            &[
                Specializer::Class(rectangle),
                Specializer::Default,
                Specializer::Eql(Value::Int(0)),
            ],
        );
        assert_eq!(rendered, "(rectangle t (eql 0))");
    }
}
