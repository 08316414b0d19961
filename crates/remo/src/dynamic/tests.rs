// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cross-module tests for the conversion engine.

use crate::dynamic::{
    convert, convert_copy, total_cmp, type_of, Buffer, IntoValue, Kind, TypeDescriptor, Value,
};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;

#[test]
fn identity_is_borrowing() {
    let v = 42i32.into_value();
    let desc = v.descriptor().unwrap().clone();
    let out = convert(&v, &desc).expect("identity");
    assert!(matches!(out, Cow::Borrowed(_)));
}

#[test]
fn null_source_fails() {
    let v = Value::null();
    assert!(convert(&v, &type_of::<i32>()).is_none());
}

#[test]
fn int_widening_and_narrowing() {
    let v = 42i32.into_value();
    let wide = convert(&v, &type_of::<i64>()).expect("widen");
    assert_eq!(wide.to_int().unwrap(), 42);
    assert!(matches!(wide, Cow::Owned(_)));

    // Narrowing checks the range.
    let big = (1i64 << 40).into_value();
    assert!(convert(&big, &type_of::<i32>()).is_none());

    // Signed/unsigned crossing checks the sign.
    let neg = (-1i32).into_value();
    assert!(convert(&neg, &type_of::<u32>()).is_none());
    let ok = 7u32.into_value();
    assert_eq!(
        convert(&ok, &type_of::<i64>()).unwrap().to_int().unwrap(),
        7
    );
}

#[test]
fn float_int_bridges() {
    let f = 3.7f64.into_value();
    let i = convert(&f, &type_of::<i32>()).expect("float to int");
    assert_eq!(i.to_int().unwrap(), 3);

    let huge = 1e30f64.into_value();
    assert!(convert(&huge, &type_of::<i32>()).is_none());

    let i = 5i32.into_value();
    let f = convert(&i, &type_of::<f64>()).expect("int to float");
    assert_eq!(f.to_double().unwrap(), 5.0);
}

#[test]
fn list_conversion_owns_and_preserves() {
    let src = vec![1i32, 2, 3].into_value();
    let out = convert(&src, &type_of::<Vec<i64>>()).expect("list convert");
    assert!(matches!(out, Cow::Owned(_)));
    let round: Vec<i64> = crate::dynamic::FromValue::from_value(&out).expect("list of i64");
    assert_eq!(round, vec![1, 2, 3]);
    // The source is untouched.
    assert_eq!(src.at(0).unwrap().to_int().unwrap(), 1);
}

#[test]
fn list_conversion_overflow_fails_whole() {
    let src = vec![1i64 << 40].into_value();
    assert!(convert(&src, &type_of::<Vec<i32>>()).is_none());
    // Failure leaves the source untouched.
    assert_eq!(src.at(0).unwrap().to_int().unwrap(), 1i64 << 40);
}

#[test]
fn map_conversion_fast_paths() {
    let mut src = Value::zero(TypeDescriptor::map(
        TypeDescriptor::string(),
        type_of::<i32>(),
    ));
    src.insert("a".into_value(), 1i32.into_value()).unwrap();
    src.insert("b".into_value(), 2i32.into_value()).unwrap();

    // Same key type, converted element type.
    let target = TypeDescriptor::map(TypeDescriptor::string(), type_of::<i64>());
    let out = convert(&src, &target).expect("map convert");
    let got = out.entry(&"b".into_value()).unwrap().unwrap();
    assert_eq!(got.to_int().unwrap(), 2);
    assert_eq!(out.len().unwrap(), 2);
}

#[test]
fn tuple_conversion_pairwise() {
    let src = (1i32, "x".to_string()).into_value();
    let target = type_of::<(i64, String)>();
    let out = convert(&src, &target).expect("tuple convert");
    assert_eq!(out.at(0).unwrap().to_int().unwrap(), 1);
    assert_eq!(out.at(1).unwrap().to_str().unwrap(), "x");

    // Arity mismatch fails.
    let bad = type_of::<(i64, String, i64)>();
    assert!(convert(&src, &bad).is_none());
}

#[test]
fn string_to_raw_one_way() {
    let s = "bytes".into_value();
    let raw = convert(&s, &type_of::<Buffer>()).expect("string to raw");
    assert_eq!(raw.to_raw().unwrap(), b"bytes");

    let back = convert(&raw, &type_of::<String>());
    assert!(back.is_none(), "raw to string is not UTF-safe");
}

#[test]
fn dynamic_wrap_and_unwrap() {
    let v = 9i32.into_value();
    let boxed = convert(&v, &TypeDescriptor::dynamic()).expect("wrap");
    assert_eq!(boxed.kind(), Kind::Dynamic);

    // Unwrapping re-enters the rule list against the inner value.
    let unboxed = convert(&boxed, &type_of::<i64>()).expect("unwrap");
    assert_eq!(unboxed.to_int().unwrap(), 9);
}

#[test]
fn lossless_roundtrip_is_identity() {
    // Int -> Int same width, String -> String, List -> List same element.
    let cases = vec![
        42i32.into_value(),
        "hello".into_value(),
        vec![1i32, 2, 3].into_value(),
    ];
    for v in cases {
        let desc = v.descriptor().unwrap().clone();
        let there = convert_copy(&v, &desc).expect("forward");
        let back = convert_copy(&there, &desc).expect("back");
        assert_eq!(total_cmp(&back, &v), Ordering::Equal);
    }

    // A genuinely two-sided trip across widths.
    let v = 1234i32.into_value();
    let wide = convert_copy(&v, &type_of::<i64>()).expect("widen");
    let back = convert_copy(&wide, &type_of::<i32>()).expect("narrow back");
    assert_eq!(total_cmp(&back, &v), Ordering::Equal);
}

#[test]
fn tuple_member_string_shares_by_fingerprint() {
    // The second member has equal fingerprints on both sides, so its
    // conversion takes the borrowing identity path inside the engine.
    let s = "shared".into_value();
    let string_desc = s.descriptor().unwrap().clone();
    let borrowed = convert(&s, &type_of::<String>()).expect("identity by info");
    assert!(
        matches!(borrowed, Cow::Borrowed(_)) || Arc::ptr_eq(&string_desc, &type_of::<String>())
    );

    let src = (1i32, "x".to_string()).into_value();
    let out = convert(&src, &type_of::<(i64, String)>()).expect("tuple");
    assert_eq!(out.at(1).unwrap().to_str().unwrap(), "x");
}

#[test]
fn object_upcast_shares_record() {
    use crate::dynamic::value::tests_support::object_value;
    let meta = Arc::new(crate::meta::MetaObject::default());
    let parent = TypeDescriptor::object("Base", meta.clone(), Vec::new());
    let child = TypeDescriptor::object("Derived", meta, vec![parent.info().clone()]);

    let v = object_value(child, crate::dynamic::ObjectId(7));
    let up = convert(&v, &parent).expect("upcast");
    assert_eq!(up.to_object().unwrap(), crate::dynamic::ObjectId(7));
    assert_eq!(up.descriptor().unwrap().name(), "Base");

    // No declared inheritance, no conversion.
    let meta2 = Arc::new(crate::meta::MetaObject::default());
    let stranger = TypeDescriptor::object("Stranger", meta2, Vec::new());
    assert!(convert(&v, &stranger).is_none());
}

#[test]
fn object_to_pointer_repointerizes() {
    use crate::dynamic::value::tests_support::object_value;
    let meta = Arc::new(crate::meta::MetaObject::default());
    let obj_t = TypeDescriptor::object("Svc", meta, Vec::new());
    let ptr_t = TypeDescriptor::pointer(obj_t.clone());

    let v = object_value(obj_t, crate::dynamic::ObjectId(3));
    let p = convert(&v, &ptr_t).expect("object to pointer");
    assert_eq!(p.kind(), Kind::Pointer);
    assert_eq!(p.to_object().unwrap(), crate::dynamic::ObjectId(3));
}

#[test]
fn proxy_generator_is_consulted() {
    use crate::dynamic::value::tests_support::object_value;
    let meta = Arc::new(crate::meta::MetaObject::default());
    let src_t = TypeDescriptor::object("AnyHandle", meta.clone(), Vec::new());
    let pointee = TypeDescriptor::object("TypedProxy", meta, Vec::new());
    let ptr_t = TypeDescriptor::pointer(pointee.clone());

    let marker = pointee.clone();
    crate::dynamic::register_proxy_generator(&pointee, move |src| {
        let id = src.to_object().ok()?;
        Some(crate::dynamic::value::tests_support::object_value(
            marker.clone(),
            id,
        ))
    });

    let v = object_value(src_t, crate::dynamic::ObjectId(11));
    let proxied = convert(&v, &ptr_t).expect("proxy generated");
    assert_eq!(proxied.to_object().unwrap(), crate::dynamic::ObjectId(11));
}
