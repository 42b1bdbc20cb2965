#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use lookup_patch::attribute_info::{AttributeInfo, CodeAttribute};
use lookup_patch::code_attribute::{encode_instructions, Instruction};
use lookup_patch::field_info::{FieldAccessFlags, FieldInfo};
use lookup_patch::method_info::{MethodAccessFlags, MethodInfo};
use lookup_patch::ClassFile;

pub const LOOKUP_DESCRIPTOR: &str = "(Ljava/lang/String;)Ljava/lang/String;";
pub const SCRIPT: &str = "org/apache/commons/text/lookup/ScriptStringLookup";
pub const DNS: &str = "org/apache/commons/text/lookup/DnsStringLookup";
pub const URL: &str = "org/apache/commons/text/lookup/UrlStringLookup";

pub fn entry(class: &str) -> String {
    format!("{class}.class")
}

pub fn stamp() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 10, 21)
        .unwrap()
        .and_hms_opt(12, 30, 0)
        .unwrap()
}

fn code_attribute(
    cf: &mut ClassFile,
    max_stack: u16,
    max_locals: u16,
    instructions: &[Instruction],
    line: Option<u16>,
) -> AttributeInfo {
    let mut code = CodeAttribute::new(max_stack, max_locals, encode_instructions(instructions).unwrap());
    if let Some(line) = line {
        // line_number_table_length, start_pc, line_number
        let mut table = vec![0, 1, 0, 0];
        table.extend_from_slice(&line.to_be_bytes());
        let name = cf.get_or_add_utf8("LineNumberTable").unwrap();
        code.attributes.push(AttributeInfo::new(name, table));
    }
    let name = cf.get_or_add_utf8("Code").unwrap();
    AttributeInfo::new(name, code.to_info().unwrap())
}

fn add_method(cf: &mut ClassFile, flags: MethodAccessFlags, name: &str, descriptor: &str, code: AttributeInfo) {
    let name_index = cf.get_or_add_utf8(name).unwrap();
    let descriptor_index = cf.get_or_add_utf8(descriptor).unwrap();
    cf.methods.push(MethodInfo {
        access_flags: flags,
        name_index,
        descriptor_index,
        attributes_count: 0,
        attributes: vec![code],
    });
}

/// A class shaped like the Commons Text lookups: a constructor, a
/// `lookup(String)` that echoes its argument, an unrelated `describe()`
/// method, a field and a `SourceFile` attribute.
pub fn lookup_class(internal_name: &str) -> ClassFile {
    let mut cf = ClassFile::new(internal_name, "java/lang/Object").unwrap();

    let object_init = cf
        .get_or_add_method_ref("java/lang/Object", "<init>", "()V")
        .unwrap();
    let init = code_attribute(
        &mut cf,
        1,
        1,
        &[
            Instruction::Aload0,
            Instruction::Invokespecial(object_init),
            Instruction::Return,
        ],
        Some(10),
    );
    add_method(&mut cf, MethodAccessFlags::PUBLIC, "<init>", "()V", init);

    let lookup = code_attribute(
        &mut cf,
        1,
        2,
        &[Instruction::Aload1, Instruction::Areturn],
        Some(42),
    );
    add_method(&mut cf, MethodAccessFlags::PUBLIC, "lookup", LOOKUP_DESCRIPTOR, lookup);

    let text = cf.get_or_add_string("describe me").unwrap();
    let describe = code_attribute(
        &mut cf,
        1,
        1,
        &[Instruction::LdcW(text), Instruction::Areturn],
        None,
    );
    add_method(
        &mut cf,
        MethodAccessFlags::PUBLIC,
        "describe",
        "()Ljava/lang/String;",
        describe,
    );

    let field_name = cf.get_or_add_utf8("INSTANCE").unwrap();
    let field_descriptor = cf.get_or_add_utf8(&format!("L{internal_name};")).unwrap();
    cf.fields.push(FieldInfo::new(
        FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC,
        field_name,
        field_descriptor,
    ));

    let source_file = cf.get_or_add_utf8("SourceFile").unwrap();
    let simple_name = internal_name.rsplit('/').next().unwrap_or(internal_name);
    let source_name = cf.get_or_add_utf8(&format!("{simple_name}.java")).unwrap();
    cf.attributes
        .push(AttributeInfo::new(source_file, source_name.to_be_bytes().to_vec()));

    cf.sync_counts();
    cf
}

pub fn lookup_class_bytes(internal_name: &str) -> Vec<u8> {
    lookup_class(internal_name).to_bytes().unwrap()
}

/// Like [`lookup_class_bytes`] but `lookup` takes an `Object`.
pub fn wrong_signature_class_bytes(internal_name: &str) -> Vec<u8> {
    let mut cf = ClassFile::new(internal_name, "java/lang/Object").unwrap();
    let lookup = code_attribute(
        &mut cf,
        1,
        2,
        &[Instruction::Aconstnull, Instruction::Areturn],
        None,
    );
    add_method(
        &mut cf,
        MethodAccessFlags::PUBLIC,
        "lookup",
        "(Ljava/lang/Object;)Ljava/lang/String;",
        lookup,
    );
    cf.sync_counts();
    cf.to_bytes().unwrap()
}

/// Entries are written in the given order with the given compression.
pub fn build_jar(entries: &[(&str, &[u8], CompressionMethod)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data, method) in entries {
        let options = SimpleFileOptions::default()
            .compression_method(*method)
            .unix_permissions(0o644);
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.set_comment("built for tests");
    writer.finish().unwrap().into_inner()
}

pub fn manifest() -> &'static [u8] {
    b"Manifest-Version: 1.0\r\nCreated-By: tests\r\n\r\n"
}

/// A typical application jar bundling the requested lookup classes.
pub fn app_jar(classes: &[&str]) -> Vec<u8> {
    let bodies: Vec<(String, Vec<u8>)> = classes
        .iter()
        .map(|c| (entry(c), lookup_class_bytes(c)))
        .collect();
    let mut entries: Vec<(&str, &[u8], CompressionMethod)> = vec![
        ("META-INF/MANIFEST.MF", manifest(), CompressionMethod::Deflated),
        ("com/example/App.class", b"\xca\xfe\xba\xbe not really", CompressionMethod::Deflated),
        ("static/logo.txt", b"stored, not deflated", CompressionMethod::Stored),
    ];
    for (name, data) in &bodies {
        entries.push((name.as_str(), data.as_slice(), CompressionMethod::Deflated));
    }
    build_jar(&entries)
}

pub fn write_jar(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// Files next to `original` whose name marks them as backups of it.
pub fn find_backups(original: &Path) -> Vec<PathBuf> {
    let stem = original.file_stem().unwrap().to_string_lossy().into_owned();
    let mut found: Vec<PathBuf> = fs::read_dir(original.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            let name = p.file_name().unwrap().to_string_lossy();
            name.starts_with(&format!("{stem}_")) && name.contains(".orig")
        })
        .collect();
    found.sort();
    found
}

/// (name, compression, raw compressed bytes) for every entry.
pub fn raw_entries(jar: &[u8]) -> Vec<(String, CompressionMethod, Vec<u8>)> {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(Cursor::new(jar)).unwrap();
    let mut out = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index_raw(i).unwrap();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        out.push((file.name().to_string(), file.compression(), data));
    }
    out
}

pub fn read_entry(jar: &[u8], name: &str) -> Vec<u8> {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(Cursor::new(jar)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut data = Vec::new();
    file.read_to_end(&mut data).unwrap();
    data
}

/// Decoded body of `name`+`descriptor`.
pub fn method_code(cf: &ClassFile, name: &str, descriptor: &str) -> CodeAttribute {
    let idx = cf.find_method(name, descriptor).unwrap();
    let attr = cf.methods[idx]
        .attributes
        .iter()
        .find(|a| cf.attribute_name(a).as_deref() == Some("Code"))
        .unwrap();
    CodeAttribute::from_info(&attr.info).unwrap()
}

/// The string a `ldc`/`ldc_w` + `areturn` body returns.
pub fn returned_string(cf: &ClassFile, name: &str, descriptor: &str) -> String {
    use lookup_patch::code_attribute::decode_instructions;
    use lookup_patch::constant_info::ConstantInfo;

    let code = method_code(cf, name, descriptor);
    let instructions = decode_instructions(&code.code).unwrap();
    let index = match instructions.as_slice() {
        [Instruction::Ldc(i), Instruction::Areturn] => *i as u16,
        [Instruction::LdcW(i), Instruction::Areturn] => *i,
        other => panic!("not a constant string body: {other:?}"),
    };
    match cf.constant(index) {
        Some(ConstantInfo::String(s)) => cf.get_utf8(s.string_index).unwrap().into_owned(),
        other => panic!("expected a string constant, got {other:?}"),
    }
}
