//! Class database
//!
//! Maps class names to their method binds, registered properties and declared
//! signals. Built once through [`ClassDbBuilder`] and shared read-only as
//! `Arc<ClassDb>`; every [`ObjectDb`](crate::ObjectDb) is handed the registry
//! it resolves against.

use super::TypeInfo;
use crate::error::{CallError, ClassDbError, ObjectError, ObjectResult};
use crate::object::{object_cast_mut, Class, Context, Object, StaticClass};
use crate::property::{MethodInfo, PropertyInfo};
use crate::value::Variant;
use rustc_hash::FxHashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Type-erased method implementation
pub type MethodFn =
    dyn Fn(&mut dyn Class, &mut Context<'_>, &[Variant]) -> Result<Variant, CallError> + Send + Sync;

/// Constructor for instantiable classes
pub type Constructor = fn() -> Box<dyn Class>;

/// A callable registered under a method name
#[derive(Clone)]
pub struct MethodBind {
    info: MethodInfo,
    func: Arc<MethodFn>,
}

impl MethodBind {
    /// Method descriptor
    pub fn info(&self) -> &MethodInfo {
        &self.info
    }

    /// Invoke on an object whose chain contains the binding class
    pub fn call(
        &self,
        object: &mut dyn Class,
        ctx: &mut Context<'_>,
        args: &[Variant],
    ) -> Result<Variant, CallError> {
        (self.func)(object, ctx, args)
    }
}

impl fmt::Debug for MethodBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodBind").field("info", &self.info).finish()
    }
}

/// Property backed by setter and getter method binds
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyBinding {
    /// Descriptor reported in property lists
    pub info: PropertyInfo,
    /// Method called with the new value
    pub setter: Option<String>,
    /// Method called with no arguments
    pub getter: Option<String>,
    /// Signal emitted with the new value after a successful set
    pub changed_signal: Option<String>,
}

impl PropertyBinding {
    /// Create a binding with no accessors
    pub fn new(info: PropertyInfo) -> Self {
        Self {
            info,
            setter: None,
            getter: None,
            changed_signal: None,
        }
    }

    /// Set the setter method
    pub fn setter(mut self, method: impl Into<String>) -> Self {
        self.setter = Some(method.into());
        self
    }

    /// Set the getter method
    pub fn getter(mut self, method: impl Into<String>) -> Self {
        self.getter = Some(method.into());
        self
    }

    /// Emit `signal` after each successful assignment
    pub fn changed_signal(mut self, signal: impl Into<String>) -> Self {
        self.changed_signal = Some(signal.into());
        self
    }
}

/// Everything registered for one class
pub struct ClassData {
    type_info: &'static TypeInfo,
    methods: FxHashMap<String, MethodBind>,
    method_order: Vec<String>,
    properties: Vec<PropertyBinding>,
    signals: Vec<MethodInfo>,
    constructor: Option<Constructor>,
}

impl ClassData {
    fn new(type_info: &'static TypeInfo, constructor: Option<Constructor>) -> Self {
        Self {
            type_info,
            methods: FxHashMap::default(),
            method_order: Vec::new(),
            properties: Vec::new(),
            signals: Vec::new(),
            constructor,
        }
    }

    /// Class descriptor
    pub fn type_info(&self) -> &'static TypeInfo {
        self.type_info
    }

    /// Methods declared by this class, in registration order
    pub fn methods(&self) -> impl Iterator<Item = &MethodBind> {
        self.method_order
            .iter()
            .filter_map(move |name| self.methods.get(name))
    }

    /// Properties declared by this class
    pub fn properties(&self) -> &[PropertyBinding] {
        &self.properties
    }

    /// Signals declared by this class
    pub fn signals(&self) -> &[MethodInfo] {
        &self.signals
    }
}

/// Registration hook implemented by every class placed in a [`ClassDb`]
pub trait Bind: Class + StaticClass + Sized {
    /// Register methods, properties and signals
    fn bind(_class: &mut ClassBuilder<'_, Self>) {}
}

/// Collects the binds of one class during registration
pub struct ClassBuilder<'a, T> {
    data: &'a mut ClassData,
    _marker: PhantomData<fn(&mut T)>,
}

impl<'a, T: Class> ClassBuilder<'a, T> {
    /// Bind a method; the closure receives the `T` level of the receiver
    pub fn method<F>(&mut self, info: impl Into<MethodInfo>, f: F) -> &mut Self
    where
        F: Fn(&mut T, &mut Context<'_>, &[Variant]) -> Result<Variant, CallError>
            + Send
            + Sync
            + 'static,
    {
        let info = info.into();
        let name = info.name.clone();
        let func: Arc<MethodFn> = Arc::new(
            move |object: &mut dyn Class, ctx: &mut Context<'_>, args: &[Variant]| {
                let level = object_cast_mut::<T>(object).ok_or(CallError::InstanceIsNull)?;
                f(level, ctx, args)
            },
        );
        if self
            .data
            .methods
            .insert(name.clone(), MethodBind { info, func })
            .is_none()
        {
            self.data.method_order.push(name);
        }
        self
    }

    /// Register a property backed by method binds
    pub fn property(&mut self, binding: PropertyBinding) -> &mut Self {
        self.data.properties.push(binding);
        self
    }

    /// Declare a signal
    pub fn signal(&mut self, info: impl Into<MethodInfo>) -> &mut Self {
        self.data.signals.push(info.into());
        self
    }
}

fn construct<T: Class + Default>() -> Box<dyn Class> {
    Box::new(T::default())
}

/// Builder for [`ClassDb`]; the root [`Object`] class is pre-registered
pub struct ClassDbBuilder {
    db: ClassDb,
}

impl ClassDbBuilder {
    /// Create a builder holding only the root class
    pub fn new() -> Self {
        let mut data = ClassData::new(Object::static_type(), Some(construct::<Object>));
        Object::bind(&mut ClassBuilder {
            data: &mut data,
            _marker: PhantomData,
        });
        let mut db = ClassDb {
            classes: FxHashMap::default(),
            order: Vec::new(),
        };
        db.insert(data);
        Self { db }
    }

    /// Register a class that can only be constructed by value
    pub fn register<T: Bind>(&mut self) -> Result<&mut Self, ClassDbError> {
        self.add::<T>(None)
    }

    /// Register a class that can also be constructed by name
    pub fn register_instantiable<T: Bind + Default>(&mut self) -> Result<&mut Self, ClassDbError> {
        self.add::<T>(Some(construct::<T>))
    }

    fn add<T: Bind>(&mut self, constructor: Option<Constructor>) -> Result<&mut Self, ClassDbError> {
        let info = T::static_type();
        let class = info.name();
        if self.db.class_exists(class) {
            return Err(ClassDbError::AlreadyRegistered(class));
        }
        if let Some(base) = info.base() {
            if !self.db.class_exists(base.name()) {
                return Err(ClassDbError::BaseNotRegistered {
                    class,
                    base: base.name(),
                });
            }
        }

        let mut data = ClassData::new(info, constructor);
        T::bind(&mut ClassBuilder {
            data: &mut data,
            _marker: PhantomData,
        });
        self.validate(&data)?;

        tracing::debug!(
            class,
            methods = data.methods.len(),
            properties = data.properties.len(),
            signals = data.signals.len(),
            "registered class"
        );
        self.db.insert(data);
        Ok(self)
    }

    fn validate(&self, data: &ClassData) -> Result<(), ClassDbError> {
        let class = data.type_info.name();
        let base = data.type_info.base().map(TypeInfo::name);
        let has_method = |method: &str| {
            data.methods.contains_key(method)
                || base.map_or(false, |base| self.db.has_method(base, method))
        };
        let has_signal = |signal: &str| {
            data.signals.iter().any(|info| info.name == signal)
                || base.map_or(false, |base| self.db.has_signal(base, signal))
        };

        for binding in &data.properties {
            for method in binding.setter.iter().chain(binding.getter.iter()) {
                if !has_method(method) {
                    return Err(ClassDbError::UnknownAccessor {
                        class,
                        property: binding.info.name.clone(),
                        method: method.clone(),
                    });
                }
            }
            if let Some(signal) = &binding.changed_signal {
                if !has_signal(signal) {
                    return Err(ClassDbError::UnknownChangeSignal {
                        class,
                        property: binding.info.name.clone(),
                        signal: signal.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Finish registration
    pub fn build(self) -> Arc<ClassDb> {
        Arc::new(self.db)
    }
}

impl Default for ClassDbBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClassDbBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDbBuilder").field("db", &self.db).finish()
    }
}

/// Registry of reflected classes
pub struct ClassDb {
    classes: FxHashMap<&'static str, ClassData>,
    order: Vec<&'static str>,
}

impl ClassDb {
    /// Start a new registry
    pub fn builder() -> ClassDbBuilder {
        ClassDbBuilder::new()
    }

    fn insert(&mut self, data: ClassData) {
        let name = data.type_info.name();
        self.order.push(name);
        self.classes.insert(name, data);
    }

    /// Registered data for one class
    pub fn class_data(&self, class: &str) -> Option<&ClassData> {
        self.classes.get(class)
    }

    /// Walk from `class` to the root, most-derived first
    fn chain<'s>(&'s self, class: &str) -> impl Iterator<Item = &'s ClassData> + 's {
        self.classes
            .get(class)
            .into_iter()
            .flat_map(|data| data.type_info.ancestors())
            .filter_map(move |info| self.classes.get(info.name()))
    }

    /// Check if a class is registered
    pub fn class_exists(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Descriptor of a registered class
    pub fn type_info(&self, class: &str) -> Option<&'static TypeInfo> {
        self.classes.get(class).map(|data| data.type_info)
    }

    /// Direct base of a registered class
    pub fn get_parent_class(&self, class: &str) -> Option<&'static str> {
        self.type_info(class)?.base().map(TypeInfo::name)
    }

    /// Check if `class` is `parent` or inherits from it
    pub fn is_parent_class(&self, class: &str, parent: &str) -> bool {
        self.type_info(class)
            .map_or(false, |info| info.is_class(parent))
    }

    /// All registered classes in registration order
    pub fn get_class_list(&self) -> Vec<&'static str> {
        self.order.clone()
    }

    /// Every registered class deriving from `class`, excluding itself
    pub fn inheriters_of(&self, class: &str) -> Vec<&'static str> {
        self.order
            .iter()
            .copied()
            .filter(|name| *name != class && self.is_parent_class(name, class))
            .collect()
    }

    /// Resolve a method bind on the class or its ancestors
    pub fn find_method(&self, class: &str, method: &str) -> Option<&MethodBind> {
        self.chain(class).find_map(|data| data.methods.get(method))
    }

    /// Check if the class or an ancestor binds `method`
    pub fn has_method(&self, class: &str, method: &str) -> bool {
        self.find_method(class, method).is_some()
    }

    /// Every bind of `method` along the chain, most-derived first.
    ///
    /// Unlike [`ClassDb::find_method`], overridden binds are included.
    pub fn find_method_levels(&self, class: &str, method: &str) -> Vec<MethodBind> {
        self.chain(class)
            .filter_map(|data| data.methods.get(method).cloned())
            .collect()
    }

    /// Method descriptors, base classes first when `inherited`
    pub fn get_method_list(&self, class: &str, inherited: bool) -> Vec<MethodInfo> {
        self.collect(class, inherited, |data, out| {
            out.extend(data.methods().map(|bind| bind.info.clone()));
        })
    }

    /// Resolve a declared signal on the class or its ancestors
    pub fn get_signal(&self, class: &str, signal: &str) -> Option<&MethodInfo> {
        self.chain(class)
            .find_map(|data| data.signals.iter().find(|info| info.name == signal))
    }

    /// Check if the class or an ancestor declares `signal`
    pub fn has_signal(&self, class: &str, signal: &str) -> bool {
        self.get_signal(class, signal).is_some()
    }

    /// Signal descriptors, base classes first when `inherited`
    pub fn get_signal_list(&self, class: &str, inherited: bool) -> Vec<MethodInfo> {
        self.collect(class, inherited, |data, out| {
            out.extend(data.signals.iter().cloned());
        })
    }

    /// Registered property descriptors, base classes first when `inherited`
    pub fn class_property_list(&self, class: &str, inherited: bool) -> Vec<PropertyInfo> {
        self.collect(class, inherited, |data, out| {
            out.extend(data.properties.iter().map(|binding| binding.info.clone()));
        })
    }

    /// Resolve a registered property on the class or its ancestors
    pub fn find_property(&self, class: &str, property: &str) -> Option<&PropertyBinding> {
        self.chain(class)
            .find_map(|data| data.properties.iter().find(|p| p.info.name == property))
    }

    fn collect<T>(
        &self,
        class: &str,
        inherited: bool,
        mut visit: impl FnMut(&ClassData, &mut Vec<T>),
    ) -> Vec<T> {
        let mut levels: Vec<&ClassData> = if inherited {
            self.chain(class).collect()
        } else {
            self.classes.get(class).into_iter().collect()
        };
        levels.reverse();
        let mut out = Vec::new();
        for data in levels {
            visit(data, &mut out);
        }
        out
    }

    /// Check if the class was registered with a constructor
    pub fn can_instantiate(&self, class: &str) -> bool {
        self.classes
            .get(class)
            .map_or(false, |data| data.constructor.is_some())
    }

    /// Construct a default instance by class name
    pub fn instantiate(&self, class: &str) -> ObjectResult<Box<dyn Class>> {
        let data = self
            .classes
            .get(class)
            .ok_or_else(|| ObjectError::UnknownClass(class.to_string()))?;
        let constructor = data
            .constructor
            .ok_or_else(|| ObjectError::NotInstantiable(class.to_string()))?;
        Ok(constructor())
    }
}

impl fmt::Debug for ClassDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDb").field("classes", &self.order).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declare_class;
    use crate::value::{arg, VariantType};

    #[derive(Default)]
    struct Lamp {
        base: Object,
        lit: bool,
    }

    declare_class!(Lamp: Object => base);
    impl Class for Lamp {}

    impl Bind for Lamp {
        fn bind(class: &mut ClassBuilder<'_, Self>) {
            class
                .method(
                    MethodInfo::new("set_lit").with_arg("lit", VariantType::Bool),
                    |lamp, _, args| {
                        lamp.lit = arg(args, 0)?;
                        Ok(Variant::Nil)
                    },
                )
                .method(
                    MethodInfo::new("is_lit").returning(VariantType::Bool),
                    |lamp, _, _| Ok(lamp.lit.into()),
                )
                .signal("toggled")
                .property(
                    PropertyBinding::new(PropertyInfo::new("lit", VariantType::Bool))
                        .setter("set_lit")
                        .getter("is_lit")
                        .changed_signal("toggled"),
                );
        }
    }

    #[derive(Default)]
    struct DeskLamp {
        lamp: Lamp,
    }

    declare_class!(DeskLamp: Lamp => lamp);
    impl Class for DeskLamp {}
    impl Bind for DeskLamp {}

    #[derive(Default)]
    struct Broken {
        base: Object,
    }

    declare_class!(Broken: Object => base);
    impl Class for Broken {}
    impl Bind for Broken {
        fn bind(class: &mut ClassBuilder<'_, Self>) {
            class.property(
                PropertyBinding::new(PropertyInfo::new("x", VariantType::Int)).setter("set_x"),
            );
        }
    }

    fn registry() -> Arc<ClassDb> {
        let mut builder = ClassDb::builder();
        builder
            .register_instantiable::<Lamp>()
            .unwrap()
            .register::<DeskLamp>()
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_root_is_preregistered() {
        let db = ClassDb::builder().build();
        assert!(db.class_exists("Object"));
        assert_eq!(db.get_parent_class("Object"), None);
        assert!(db.has_signal("Object", "script_changed"));
    }

    #[test]
    fn test_inheritance_queries() {
        let db = registry();
        assert_eq!(db.get_class_list(), vec!["Object", "Lamp", "DeskLamp"]);
        assert_eq!(db.get_parent_class("DeskLamp"), Some("Lamp"));
        assert!(db.is_parent_class("DeskLamp", "Object"));
        assert!(!db.is_parent_class("Lamp", "DeskLamp"));
        assert_eq!(db.inheriters_of("Lamp"), vec!["DeskLamp"]);
    }

    #[test]
    fn test_inherited_lookups() {
        let db = registry();
        assert!(db.has_method("DeskLamp", "set_lit"));
        assert!(db.has_method("DeskLamp", "get_class"));
        assert!(db.has_signal("DeskLamp", "toggled"));
        assert!(db.find_property("DeskLamp", "lit").is_some());
        assert!(db.get_method_list("DeskLamp", false).is_empty());

        let props = db.class_property_list("DeskLamp", true);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name, "lit");
    }

    #[test]
    fn test_method_levels() {
        let db = registry();
        let levels = db.find_method_levels("DeskLamp", "set_lit");
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].info().name, "set_lit");
        assert_eq!(db.find_method_levels("DeskLamp", "get_class").len(), 1);
        assert!(db.find_method_levels("DeskLamp", "missing").is_empty());
    }

    #[test]
    fn test_duplicate_and_missing_base() {
        let mut builder = ClassDb::builder();
        assert_eq!(
            builder.register::<DeskLamp>().unwrap_err(),
            ClassDbError::BaseNotRegistered {
                class: "DeskLamp",
                base: "Lamp"
            }
        );
        builder.register::<Lamp>().unwrap();
        assert_eq!(
            builder.register::<Lamp>().unwrap_err(),
            ClassDbError::AlreadyRegistered("Lamp")
        );
    }

    #[test]
    fn test_unknown_accessor_rejected() {
        let mut builder = ClassDb::builder();
        assert!(matches!(
            builder.register::<Broken>(),
            Err(ClassDbError::UnknownAccessor { .. })
        ));
    }

    #[test]
    fn test_instantiate_by_name() {
        let db = registry();
        let lamp = db.instantiate("Lamp").unwrap();
        assert_eq!(lamp.type_info().name(), "Lamp");
        assert!(matches!(
            db.instantiate("DeskLamp"),
            Err(ObjectError::NotInstantiable(_))
        ));
        assert!(matches!(
            db.instantiate("Nope"),
            Err(ObjectError::UnknownClass(_))
        ));
    }
}
