use daogen_sql::{
    artifact::{CompiledDao, MethodPlan},
    template::Params,
};

///
/// Hooks
///
/// Observers notified around dao operations. The loader's callers drive
/// dispatch; a dao only emits the events its descriptor declares, either
/// the bare operation name (`insert`, both phases) or a phase-specific
/// one (`insertbefore`, `deleteafter`, ...). Bulk deletes driven by a
/// condition tree are a separate event family (`deleteby`). Delete
/// observers receive the outcome on the After phase.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HookPhase {
    Before,
    After,
}

///
/// DeleteOutcome
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeleteOutcome {
    Affected(u64),
    Failed,
}

///
/// DaoHook
///

pub trait DaoHook {
    fn on_insert(&mut self, _dao: &CompiledDao, _phase: HookPhase, _record: &Params) {}

    fn on_update(&mut self, _dao: &CompiledDao, _phase: HookPhase, _record: &Params) {}

    /// `outcome` is `None` on the Before phase.
    fn on_delete(
        &mut self,
        _dao: &CompiledDao,
        _phase: HookPhase,
        _keys: &Params,
        _outcome: Option<DeleteOutcome>,
    ) {
    }

    /// Bulk delete by condition, not by primary key. `outcome` is `None`
    /// on the Before phase.
    fn on_delete_by(
        &mut self,
        _dao: &CompiledDao,
        _phase: HookPhase,
        _criteria: &Params,
        _outcome: Option<DeleteOutcome>,
    ) {
    }

    fn on_method(
        &mut self,
        _dao: &CompiledDao,
        _method: &MethodPlan,
        _phase: HookPhase,
        _params: &Params,
    ) {
    }
}

///
/// HookRegistry
///

#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Box<dyn DaoHook>>,
}

impl HookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Box<dyn DaoHook>) {
        self.hooks.push(hook);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn dispatch_insert(&mut self, dao: &CompiledDao, phase: HookPhase, record: &Params) {
        if wants_event(dao, "insert", phase) {
            for hook in &mut self.hooks {
                hook.on_insert(dao, phase, record);
            }
        }
    }

    pub fn dispatch_update(&mut self, dao: &CompiledDao, phase: HookPhase, record: &Params) {
        if wants_event(dao, "update", phase) {
            for hook in &mut self.hooks {
                hook.on_update(dao, phase, record);
            }
        }
    }

    pub fn dispatch_delete(
        &mut self,
        dao: &CompiledDao,
        phase: HookPhase,
        keys: &Params,
        outcome: Option<DeleteOutcome>,
    ) {
        if wants_event(dao, "delete", phase) {
            for hook in &mut self.hooks {
                hook.on_delete(dao, phase, keys, outcome);
            }
        }
    }

    pub fn dispatch_delete_by(
        &mut self,
        dao: &CompiledDao,
        phase: HookPhase,
        criteria: &Params,
        outcome: Option<DeleteOutcome>,
    ) {
        if wants_event(dao, "deleteby", phase) {
            for hook in &mut self.hooks {
                hook.on_delete_by(dao, phase, criteria, outcome);
            }
        }
    }

    pub fn dispatch_method(
        &mut self,
        dao: &CompiledDao,
        method: &MethodPlan,
        phase: HookPhase,
        params: &Params,
    ) {
        let wanted = match phase {
            HookPhase::Before => method.event_before,
            HookPhase::After => method.event_after,
        };
        if wanted {
            for hook in &mut self.hooks {
                hook.on_method(dao, method, phase, params);
            }
        }
    }
}

/// The bare event name enables both phases; the suffixed forms enable one.
fn wants_event(dao: &CompiledDao, base: &str, phase: HookPhase) -> bool {
    let suffix = match phase {
        HookPhase::Before => "before",
        HookPhase::After => "after",
    };
    dao.events
        .iter()
        .any(|e| e == base || e.strip_prefix(base) == Some(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl DaoHook for Recorder {
        fn on_insert(&mut self, _dao: &CompiledDao, phase: HookPhase, _record: &Params) {
            self.calls.borrow_mut().push(format!("insert:{phase:?}"));
        }

        fn on_delete(
            &mut self,
            _dao: &CompiledDao,
            phase: HookPhase,
            _keys: &Params,
            outcome: Option<DeleteOutcome>,
        ) {
            self.calls
                .borrow_mut()
                .push(format!("delete:{phase:?}:{outcome:?}"));
        }

        fn on_delete_by(
            &mut self,
            _dao: &CompiledDao,
            phase: HookPhase,
            _criteria: &Params,
            outcome: Option<DeleteOutcome>,
        ) {
            self.calls
                .borrow_mut()
                .push(format!("deleteby:{phase:?}:{outcome:?}"));
        }

        fn on_method(
            &mut self,
            _dao: &CompiledDao,
            method: &MethodPlan,
            phase: HookPhase,
            _params: &Params,
        ) {
            self.calls
                .borrow_mut()
                .push(format!("{}:{phase:?}", method.name));
        }
    }

    fn dao_with(events: &[&str]) -> CompiledDao {
        use daogen_schema::{error::SchemaIdentity, parse::NoImports, parse::Parser};
        use daogen_sql::{dialect::Dialect, generate::Generator};

        let body = r#"{
            "datasource": { "primary_table": { "name": "p", "realname": "products",
                                               "primary_key": ["id"] } },
            "record": { "properties": [ { "name": "id", "datatype": "integer" } ] },
            "factory": {
                "events": [],
                "methods": [
                    { "name": "purge", "type": "delete", "eventbefore": true }
                ]
            }
        }"#;
        let identity = SchemaIdentity::new("products", "products.dao.json");
        let mut model = Parser::new(identity, &Dialect::Sqlite, &NoImports)
            .parse_str(body)
            .unwrap();
        model.events = events.iter().map(ToString::to_string).collect();

        Generator::new(Dialect::Sqlite).compile(&model).unwrap()
    }

    fn registry_with(calls: &Rc<RefCell<Vec<String>>>) -> HookRegistry {
        let mut registry = HookRegistry::new();
        registry.register(Box::new(Recorder {
            calls: Rc::clone(calls),
        }));
        registry
    }

    #[test]
    fn events_gate_record_dispatch() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut registry = registry_with(&calls);

        let silent = dao_with(&[]);
        registry.dispatch_insert(&silent, HookPhase::Before, &Params::new());
        assert!(calls.borrow().is_empty());

        let loud = dao_with(&["insert"]);
        registry.dispatch_insert(&loud, HookPhase::Before, &Params::new());
        registry.dispatch_insert(&loud, HookPhase::After, &Params::new());
        assert_eq!(
            calls.borrow().as_slice(),
            ["insert:Before", "insert:After"]
        );
    }

    #[test]
    fn suffixed_events_gate_a_single_phase() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut registry = registry_with(&calls);

        let dao = dao_with(&["insertafter"]);
        registry.dispatch_insert(&dao, HookPhase::Before, &Params::new());
        assert!(calls.borrow().is_empty());

        registry.dispatch_insert(&dao, HookPhase::After, &Params::new());
        assert_eq!(calls.borrow().as_slice(), ["insert:After"]);
    }

    #[test]
    fn delete_after_carries_the_outcome() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut registry = registry_with(&calls);

        let dao = dao_with(&["delete"]);
        registry.dispatch_delete(&dao, HookPhase::Before, &Params::new(), None);
        registry.dispatch_delete(
            &dao,
            HookPhase::After,
            &Params::new(),
            Some(DeleteOutcome::Affected(3)),
        );
        assert_eq!(
            calls.borrow().as_slice(),
            ["delete:Before:None", "delete:After:Some(Affected(3))"]
        );
    }

    #[test]
    fn bulk_deletes_are_a_separate_event_family() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut registry = registry_with(&calls);

        let dao = dao_with(&["deleteby"]);
        registry.dispatch_delete(&dao, HookPhase::Before, &Params::new(), None);
        assert!(calls.borrow().is_empty());

        registry.dispatch_delete_by(
            &dao,
            HookPhase::After,
            &Params::new(),
            Some(DeleteOutcome::Failed),
        );
        assert_eq!(
            calls.borrow().as_slice(),
            ["deleteby:After:Some(Failed)"]
        );
    }

    #[test]
    fn method_flags_gate_method_dispatch() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut registry = registry_with(&calls);

        let dao = dao_with(&[]);
        let purge = dao.method("purge").unwrap();

        registry.dispatch_method(&dao, purge, HookPhase::After, &Params::new());
        assert!(calls.borrow().is_empty());

        registry.dispatch_method(&dao, purge, HookPhase::Before, &Params::new());
        assert_eq!(calls.borrow().as_slice(), ["purge:Before"]);
    }
}
