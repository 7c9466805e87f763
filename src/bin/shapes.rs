use rylos::classes::{ClassRegistry, Instance};
use rylos::conditions::GenericError;
use rylos::generic::{GenericFunction, Specializer};
use rylos::types::Value;
use tracing_subscriber::EnvFilter;

fn slot_number(inst: &Instance, name: &str) -> Result<f64, GenericError> {
    match inst.slot(name) {
        Some(Value::Float(x)) => Ok(*x),
        Some(Value::Int(n)) => Ok(*n as f64),
        _ => Err(GenericError::Signal {
            message: format!("slot {} is not a number", name),
        }),
    }
}

fn shape_argument(args: &[Value]) -> Result<&Instance, GenericError> {
    match args.first() {
        Some(Value::Instance(inst)) => Ok(inst),
        _ => Err(GenericError::Signal {
            message: "expected a shape instance".to_string(),
        }),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Init...");
    let mut classes = ClassRegistry::new();

    // 1. Shape hierarchy: shape > (rectangle > square, circle)
    let shape = classes
        .define_class("shape", &[], &["name"])
        .expect("consistent hierarchy");
    let rectangle = classes
        .define_class("rectangle", &[shape], &["width", "height"])
        .expect("consistent hierarchy");
    let square = classes
        .define_class("square", &[rectangle], &[])
        .expect("consistent hierarchy");
    let circle = classes
        .define_class("circle", &[shape], &["radius"])
        .expect("consistent hierarchy");
    println!("[*] Defined classes: shape > (rectangle > square, circle)");

    // 2. Perimeter: one implementation per registered class branch
    let mut perimeter = GenericFunction::new("perimeter", "Perimeter of a shape.");
    perimeter
        .register(
            &classes,
            &[Specializer::Class(rectangle)],
            Value::function(|args| {
                let inst = shape_argument(args)?;
                let width = slot_number(inst, "width")?;
                let height = slot_number(inst, "height")?;
                Ok(Value::Float(2.0 * (width + height)))
            }),
        )
        .expect("register perimeter/rectangle");
    perimeter
        .register(
            &classes,
            &[Specializer::Class(circle)],
            Value::function(|args| {
                let inst = shape_argument(args)?;
                let radius = slot_number(inst, "radius")?;
                Ok(Value::Float(std::f64::consts::TAU * radius))
            }),
        )
        .expect("register perimeter/circle");

    let rect = classes
        .make_instance(
            rectangle,
            &[("width", Value::Int(3)), ("height", Value::Int(4))],
        )
        .expect("make rectangle");
    let sq = classes
        .make_instance(square, &[("width", Value::Int(2)), ("height", Value::Int(2))])
        .expect("make square");
    let disc = classes
        .make_instance(circle, &[("radius", Value::Float(1.0))])
        .expect("make circle");

    let result = perimeter
        .invoke(&classes, &[Value::Instance(rect.clone())])
        .expect("rectangle perimeter");
    println!("[*] perimeter(rectangle 3x4) = {}", result);
    if result != Value::Float(14.0) {
        println!("[FAILURE] Expected 14.0");
        std::process::exit(1);
    }

    // Squares have no branch of their own; the walk lands on rectangle.
    let result = perimeter
        .invoke(&classes, &[Value::Instance(sq)])
        .expect("square perimeter");
    println!("[*] perimeter(square 2x2)    = {} (via rectangle branch)", result);
    if result != Value::Float(8.0) {
        println!("[FAILURE] Expected 8.0");
        std::process::exit(1);
    }

    let result = perimeter
        .invoke(&classes, &[Value::Instance(disc)])
        .expect("circle perimeter");
    println!("[*] perimeter(circle r=1)    = {}", result);
    println!("[+] Class dispatch OK");

    // 3. Value specializers outrank class specializers
    let mut scale = GenericFunction::new("scale", "Scale a shape by a factor.");
    scale
        .register(
            &classes,
            &[
                Specializer::Class(shape),
                Specializer::Class(classes.number_class),
            ],
            Value::function(|args| Ok(Value::string(&format!("scaled by {}", args[1])))),
        )
        .expect("register scale/number");
    scale
        .register(
            &classes,
            &[Specializer::Class(shape), Specializer::Eql(Value::Int(0))],
            Value::function(|_args| Ok(Value::string("collapsed to a point"))),
        )
        .expect("register scale/zero");

    let by_three = scale
        .invoke(&classes, &[Value::Instance(rect.clone()), Value::Int(3)])
        .expect("scale by 3");
    let by_zero = scale
        .invoke(&classes, &[Value::Instance(rect.clone()), Value::Int(0)])
        .expect("scale by 0");
    let by_float_zero = scale
        .invoke(&classes, &[Value::Instance(rect.clone()), Value::Float(0.0)])
        .expect("scale by 0.0");
    println!("[*] scale(rect, 3)   = {}", by_three);
    println!("[*] scale(rect, 0)   = {}", by_zero);
    println!("[*] scale(rect, 0.0) = {} (same eql key as 0)", by_float_zero);
    if by_zero != Value::string("collapsed to a point") || by_zero != by_float_zero {
        println!("[FAILURE] Value specializer did not outrank the class branch");
        std::process::exit(1);
    }
    println!("[+] Value-over-class precedence OK");

    // 4. Default branch and dispatch failure
    perimeter
        .register(
            &classes,
            &[Specializer::Default],
            Value::function(|_args| Ok(Value::string("unmeasurable"))),
        )
        .expect("register perimeter/default");
    let fallback = perimeter
        .invoke(&classes, &[Value::string("not a shape")])
        .expect("default branch");
    println!("[*] perimeter(\"not a shape\") = {}", fallback);

    match scale.invoke(&classes, &[Value::Instance(rect.clone()), Value::string("big")]) {
        Err(err @ GenericError::NoApplicableMethod { .. }) => {
            println!("[*] scale(rect, \"big\") failed as expected: {}", err);
        }
        other => {
            println!("[FAILURE] Expected no applicable method, got {:?}", other.map(|v| v.to_string()));
            std::process::exit(1);
        }
    }
    println!("[+] Fallback and failure paths OK");

    // 5. Redefinition notice through a host handler
    perimeter.set_warning_handler(|warning| println!("[!] {}", warning));
    perimeter
        .register(
            &classes,
            &[Specializer::Class(circle)],
            Value::function(|args| {
                let inst = shape_argument(args)?;
                let radius = slot_number(inst, "radius")?;
                Ok(Value::Float(2.0 * std::f64::consts::PI * radius))
            }),
        )
        .expect("re-register perimeter/circle");

    // 6. Keyword arguments are rejected before dispatch
    match perimeter.invoke_with_keywords(
        &classes,
        &[Value::Instance(rect)],
        &[("units".to_string(), Value::string("cm"))],
    ) {
        Err(err @ GenericError::KeywordArguments { .. }) => {
            println!("[*] keyword call failed as expected: {}", err);
        }
        other => {
            println!("[FAILURE] Expected keyword rejection, got {:?}", other.map(|v| v.to_string()));
            std::process::exit(1);
        }
    }

    println!("[SUCCESS] All dispatch paths verified.");
}
