// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn descriptor_id_equality_is_by_value() {
    let a = DescriptorId::new("svc-a");
    let b = DescriptorId::new("svc-a");
    let c = DescriptorId::new("svc-b");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a, "svc-a");
}

#[test]
fn uuid_id_gen_produces_distinct_values() {
    let gen = UuidIdGen;
    let a = gen.next();
    let b = gen.next();
    assert_ne!(a, b);
}
