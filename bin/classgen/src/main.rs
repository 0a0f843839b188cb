use classgen::jvm::builder::{DirectoryDump, TypeBuilder};
use classgen::jvm::class_file::{ConstantData, Version};
use classgen::jvm::code::{CodeGenerator, Label, SwitchCallback, SwitchOptions};
use classgen::jvm::*;

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

const SAMPLES: [&str; 4] = ["hello", "answer", "switch", "guarded"];

fn main() -> Result<(), Error> {
    env_logger::init();

    let matches = Command::new("JVM class generator")
        .version("0.1.0")
        .about("Emit sample classes built with the classgen library")
        .arg(
            Arg::new("output")
                .long("output")
                .value_name("DIR")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directory receiving the class files (package directories are created)"),
        )
        .arg(
            Arg::new("verify")
                .long("verify")
                .action(ArgAction::SetTrue)
                .help("Check generic signatures before writing each class"),
        )
        .arg(
            Arg::new("target")
                .long("target")
                .value_name("MAJOR")
                .default_value("50")
                .value_parser(value_parser!(u16))
                .help("Class file major version (no stack map frames are emitted, so the samples with branches only pass the verifier up to 50)"),
        )
        .arg(
            Arg::new("package")
                .long("package")
                .value_name("PACKAGE")
                .default_value("classgen.samples")
                .help("Package of the generated classes (eg. `com.example`)"),
        )
        .arg(
            Arg::new("sample")
                .long("sample")
                .value_name("NAME")
                .action(ArgAction::Append)
                .value_parser(SAMPLES)
                .help("Sample class to generate (may be repeated, defaults to all of them)"),
        )
        .get_matches();

    let mut settings = Settings::new();
    if let Some(major) = matches.get_one::<u16>("target") {
        settings.version = Version::major(*major);
    }
    settings.verify = matches.get_flag("verify");

    let package = matches
        .get_one::<String>("package")
        .map_or("classgen.samples", String::as_str);
    let output = matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let mut sink = DirectoryDump::new(output);

    let samples: Vec<&str> = match matches.get_many::<String>("sample") {
        Some(samples) => samples.map(String::as_str).collect(),
        None => SAMPLES.to_vec(),
    };

    for sample in samples {
        log::info!("Generating sample '{}'", sample);
        let mut builder = match sample {
            "hello" => hello(package, &settings)?,
            "answer" => answer(package, &settings)?,
            "switch" => switches(package, &settings)?,
            "guarded" => guarded(package, &settings)?,
            other => {
                log::error!("Unknown sample '{}'", other);
                continue;
            }
        };
        let created = builder.create_type(&mut sink)?;
        println!("{} ({} bytes)", created.name, created.bytes.len());
    }

    Ok(())
}

fn class(package: &str, simple_name: &str, settings: &Settings) -> Result<TypeBuilder, Error> {
    TypeBuilder::new(
        &format!("{}.{}", package, simple_name),
        ClassAccessFlags::PUBLIC | ClassAccessFlags::FINAL,
        settings.clone(),
    )
}

fn println(code: &mut CodeGenerator<'_>, message: &str) -> Result<(), Error> {
    code.get_field(&FieldRef::system_out())?;
    code.emit_string(message)?;
    code.call(&MethodRef::print_stream_println())
}

/// `public static void main(String[] args)` printing a greeting
fn hello(package: &str, settings: &Settings) -> Result<TypeBuilder, Error> {
    let mut builder = class(package, "Hello", settings)?;
    let main = builder.define_method(
        "main",
        MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        vec![Type::array_of(Type::string())],
        Type::VOID,
    )?;
    builder.method_mut(main).set_parameter_name(0, "args")?;

    let mut code = builder.code_generator(main);
    println(&mut code, "Hello, world!")?;
    code.emit_return(&Type::VOID);
    Ok(builder)
}

/// A constant field and a static method both holding 42
fn answer(package: &str, settings: &Settings) -> Result<TypeBuilder, Error> {
    let mut builder = class(package, "Answer", settings)?;
    builder.define_constant("ANSWER", ConstantData::Integer(42), FieldAccessFlags::PUBLIC)?;
    let method = builder.define_method(
        "answer",
        MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        vec![],
        Type::INT,
    )?;

    let mut code = builder.code_generator(method);
    code.emit_integer(42)?;
    code.emit_return(&Type::INT);
    Ok(builder)
}

/// Names small digits, falling back to `"many"`
struct DigitNames;

impl SwitchCallback<i32> for DigitNames {
    fn emit_case(&mut self, code: &mut CodeGenerator<'_>, key: i32, _: Label) -> Result<(), Error> {
        let names = ["zero", "one", "two", "three", "four", "five"];
        code.emit_string(names.get(key as usize).copied().unwrap_or("?"))?;
        code.emit_return(&Type::string());
        Ok(())
    }

    fn emit_default(&mut self, code: &mut CodeGenerator<'_>, _: Label) -> Result<(), Error> {
        code.emit_string("many")?;
        code.emit_return(&Type::string());
        Ok(())
    }
}

/// Maps color names to their RGB value, or `-1`
struct ColorValues;

impl<'k> SwitchCallback<&'k str> for ColorValues {
    fn emit_case(&mut self, code: &mut CodeGenerator<'_>, key: &'k str, _: Label) -> Result<(), Error> {
        let value = match key {
            "red" => 0xFF0000,
            "green" => 0x00FF00,
            "blue" => 0x0000FF,
            _ => 0,
        };
        code.emit_integer(value)?;
        code.emit_return(&Type::INT);
        Ok(())
    }

    fn emit_default(&mut self, code: &mut CodeGenerator<'_>, _: Label) -> Result<(), Error> {
        code.emit_integer(-1)?;
        code.emit_return(&Type::INT);
        Ok(())
    }
}

/// Dense `int` switch, sparse `int` switch, and both kinds of `String` switch
fn switches(package: &str, settings: &Settings) -> Result<TypeBuilder, Error> {
    let mut builder = class(package, "Switches", settings)?;
    let flags = MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC;

    let methods: [(&str, SwitchOptions, &[i32]); 2] = [
        ("digit", SwitchOptions::Default, &[0, 1, 2, 3, 4, 5]),
        ("sparse", SwitchOptions::PreferLookup, &[0, 2, 5]),
    ];
    for (name, options, keys) in methods {
        let method = builder.define_method(name, flags, vec![Type::INT], Type::string())?;
        builder.method_mut(method).set_parameter_name(0, "n")?;
        let mut code = builder.code_generator(method);
        code.emit_load_argument(0)?;
        code.emit_switch(keys, &mut DigitNames, options)?;
    }

    let colors = ["red", "green", "blue"];
    for (name, options) in [("color", SwitchOptions::Default), ("colorTrie", SwitchOptions::PreferTrie)] {
        let method = builder.define_method(name, flags, vec![Type::string()], Type::INT)?;
        builder.method_mut(method).set_parameter_name(0, "name")?;
        let mut code = builder.code_generator(method);
        code.emit_load_argument(0)?;
        code.emit_string_switch(&colors, &mut ColorValues, options)?;
    }

    Ok(builder)
}

/// `Integer.parseInt` guarded by a `catch` and a `finally`
fn guarded(package: &str, settings: &Settings) -> Result<TypeBuilder, Error> {
    let mut builder = class(package, "Guarded", settings)?;
    let method = builder.define_method(
        "parse",
        MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        vec![Type::string()],
        Type::INT,
    )?;
    builder.method_mut(method).set_parameter_name(0, "text")?;

    let number_format = Type::class(
        BinaryName::from_dotted("java.lang.NumberFormatException")
            .map_err(Error::MalformedName)?,
        Some(Type::runtime_exception()),
        vec![],
    );
    let parse_int = MethodRef::static_method(
        Type::boxed_class(BaseType::Int),
        UnqualifiedName::from_string(String::from("parseInt")).map_err(Error::MalformedName)?,
        vec![Type::string()],
        Type::INT,
    );

    let mut code = builder.code_generator(method);
    let result = code.declare_local(Some("result"), Type::INT);
    let escaping = code.declare_local(None, Type::throwable());

    code.begin_exception_block();
    code.emit_load_argument(0)?;
    code.call(&parse_int)?;
    code.emit_store(result)?;
    println(&mut code, "done")?;

    code.begin_catch_block(&number_format)?;
    code.pop();
    code.emit_integer(-1)?;
    code.emit_store(result)?;
    println(&mut code, "done")?;

    code.begin_finally_block()?;
    code.emit_store(escaping)?;
    println(&mut code, "done")?;
    code.emit_load(escaping)?;
    code.emit_throw();
    code.end_exception_block()?;

    code.emit_load(result)?;
    code.emit_return(&Type::INT);
    Ok(builder)
}
