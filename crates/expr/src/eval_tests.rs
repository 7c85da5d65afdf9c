// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::parser::Parser;

fn record(pairs: &[(&str, &str)]) -> Resource {
    pairs.iter().copied().collect()
}

fn holds(text: &str, rec: &Resource) -> bool {
    eval(&Parser::parse(text).unwrap(), rec).truthy()
}

#[yare::parameterized(
    str_eq            = { "p.name == 'fwts'",            true },
    str_ne            = { "p.name != 'fwts'",            false },
    numeric_coercion  = { "p.count == 4",                true },
    numeric_order     = { "p.count > 3",                 true },
    string_vs_float   = { "p.ratio >= 0.5",              true },
    lexicographic     = { "p.name < 'zzz'",              true },
    chained           = { "1 < int(p.count) <= 4",       true },
    chained_fails     = { "1 < int(p.count) < 4",        false },
    in_list           = { "p.name in ['bash', 'fwts']",  true },
    not_in_list       = { "p.name not in ['bash']",      true },
    substring         = { "'wt' in p.name",              true },
    len_call          = { "len(p.name) == 4",            true },
    bool_call         = { "bool(p.name)",                true },
    hex_int           = { "int(p.id) == 31",             true },
    float_call        = { "float(p.ratio) < 1",          true },
    not_op            = { "not p.name == 'bash'",        true },
    or_op             = { "p.name == 'x' or p.count == '4'", true },
    and_op            = { "p.name == 'fwts' and p.count == '5'", false },
    unparsable_number = { "p.name == 4",                 false },
    unparsable_ne     = { "p.name != 4",                 true },
)]
fn evaluates(text: &str, expected: bool) {
    let rec = record(&[("name", "fwts"), ("count", "4"), ("ratio", "0.75"), ("id", "0x1f")]);
    assert_eq!(holds(text, &rec), expected, "{text}");
}

#[yare::parameterized(
    eq         = { "p.missing == 'x'" },
    ne         = { "p.missing != 'x'" },
    order      = { "p.missing > 1" },
    in_list    = { "p.missing in ['x']" },
    not_in     = { "p.missing not in ['x']" },
    len        = { "len(p.missing) == 0" },
    bad_int    = { "int(p.name) == 0" },
)]
fn undefined_makes_comparisons_false(text: &str) {
    let rec = record(&[("name", "fwts")]);
    assert!(!holds(text, &rec), "{text}");
}

#[test]
fn not_of_undefined_comparison_is_true() {
    let rec = record(&[]);
    assert!(holds("not p.missing == 'x'", &rec));
}

#[test]
fn none_literal_equals_only_none() {
    let rec = record(&[("name", "fwts")]);
    assert!(!holds("p.name == None", &rec));
    assert!(holds("None == None", &rec));
}

#[test]
fn field_of_any_resource_name_reads_the_record() {
    let rec = record(&[("name", "fwts")]);
    assert!(holds("package.name == 'fwts'", &rec));
    assert!(holds("other.name == 'fwts'", &rec));
}
