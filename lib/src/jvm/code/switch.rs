//! Lowering of `int` and `String` switches
//!
//! `int` switches become a `tableswitch` or a `lookupswitch` depending on how dense the keys are.
//! `String` switches are built out of `int` switches, either by switching on `hashCode()` and
//! then comparing with `equals`, or by switching on `length()` and then on each `charAt(i)`.
//!
//! Cases are handed a `break` label. Case code must not fall through: it should end with a jump
//! (usually to the `break` label), a return, or a throw.

use super::{CodeGenerator, Label, OpCode};
use crate::jvm::{Error, MethodRef, Type, UnqualifiedName};
use std::collections::BTreeMap;

/// Strategy hints for switch lowering
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum SwitchOptions {
    /// Pick based on key density (and hash buckets for strings)
    #[default]
    Default,

    /// Always use a `tableswitch` (unless the key range can't fit in a method)
    PreferTable,

    /// Always use a `lookupswitch`
    PreferLookup,

    /// For strings, switch on length and then character by character
    PreferTrie,
}

/// Minimum ratio of keys to table entries before a `tableswitch` gets used
const TABLE_DENSITY: f64 = 0.5;

/// Code for the cases of a switch
pub trait SwitchCallback<K> {
    fn emit_case(
        &mut self,
        code: &mut CodeGenerator<'_>,
        key: K,
        break_target: Label,
    ) -> Result<(), Error>;

    /// Code for when no key matches (falls through to the `break` label by default)
    fn emit_default(
        &mut self,
        _code: &mut CodeGenerator<'_>,
        _break_target: Label,
    ) -> Result<(), Error> {
        Ok(())
    }
}

/// Pick between `tableswitch` and `lookupswitch` for sorted, deduplicated keys
pub fn select_switch_opcode(keys: &[i32], options: SwitchOptions) -> OpCode {
    let (min, max) = match (keys.first(), keys.last()) {
        (Some(min), Some(max)) => (*min as i64, *max as i64),
        _ => return OpCode::LOOKUPSWITCH,
    };
    let range = max - min + 1;
    match options {
        SwitchOptions::PreferLookup => OpCode::LOOKUPSWITCH,
        _ if range > u16::MAX as i64 => OpCode::LOOKUPSWITCH,
        SwitchOptions::PreferTable => OpCode::TABLESWITCH,
        _ if keys.len() as f64 / range as f64 >= TABLE_DENSITY => OpCode::TABLESWITCH,
        _ => OpCode::LOOKUPSWITCH,
    }
}

/// `String.hashCode()`, computed over UTF-16 code units
pub fn java_string_hash(string: &str) -> i32 {
    string
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

impl<'a> CodeGenerator<'a> {
    /// Emit a switch instruction jumping to `labels` (one per key) or `default`
    ///
    /// The keys must be sorted and free of duplicates.
    fn emit_switch_instruction(
        &mut self,
        keys: &[i32],
        labels: &[Label],
        default: Label,
        options: SwitchOptions,
    ) -> Result<(), Error> {
        let opcode = select_switch_opcode(keys, options);
        let origin = self.offset();
        self.internal_emit(opcode);
        while self.offset() % 4 != 0 {
            self.code.code.put_u8(0);
        }
        self.switch_target(default, origin);

        if opcode == OpCode::TABLESWITCH {
            let (low, high) = (keys[0], keys[keys.len() - 1]);
            self.code.code.put_i32(low);
            self.code.code.put_i32(high);
            let mut cases = keys.iter().zip(labels).peekable();
            for value in low as i64..=high as i64 {
                let target = match cases.peek() {
                    Some((key, label)) if **key as i64 == value => {
                        let label = **label;
                        cases.next();
                        label
                    }
                    _ => default,
                };
                self.switch_target(target, origin);
            }
        } else {
            self.code.code.put_i32(keys.len() as i32);
            for (key, label) in keys.iter().zip(labels) {
                self.code.code.put_i32(*key);
                self.switch_target(*label, origin);
            }
        }

        log::trace!("Emitted {} with {} keys at {}", opcode, keys.len(), origin);
        Ok(())
    }

    fn switch_target(&mut self, label: Label, origin: usize) {
        let position = self.offset();
        self.code.labels.add_fixup(label, origin, position, 4);
        self.code.code.put_i32(0);
    }

    /// Switch over the `int` on top of the stack
    pub fn emit_switch<C>(
        &mut self,
        keys: &[i32],
        callback: &mut C,
        options: SwitchOptions,
    ) -> Result<(), Error>
    where
        C: SwitchCallback<i32>,
    {
        let mut keys = keys.to_vec();
        keys.sort_unstable();
        keys.dedup();

        let default_label = self.define_label();
        let break_label = self.define_label();
        let labels: Vec<Label> = keys.iter().map(|_| self.define_label()).collect();

        self.emit_switch_instruction(&keys, &labels, default_label, options)?;

        for (key, label) in keys.iter().zip(&labels) {
            self.mark_label(*label)?;
            callback.emit_case(self, *key, break_label)?;
        }
        self.mark_label(default_label)?;
        callback.emit_default(self, break_label)?;
        self.mark_label(break_label)?;
        Ok(())
    }

    /// Switch over the `String` on top of the stack
    ///
    /// Uses a hash switch unless `options` is [`SwitchOptions::PreferTrie`]. A `null` string
    /// throws `NullPointerException`, as it would in Java.
    pub fn emit_string_switch<C>(
        &mut self,
        keys: &[&str],
        callback: &mut C,
        options: SwitchOptions,
    ) -> Result<(), Error>
    where
        C: for<'k> SwitchCallback<&'k str>,
    {
        let mut keys = keys.to_vec();
        keys.sort_unstable();
        keys.dedup();

        let default_label = self.define_label();
        let break_label = self.define_label();
        let pop_default_label = self.define_label();

        if options == SwitchOptions::PreferTrie {
            self.emit_trie_switch(&keys, callback, pop_default_label, break_label)?;
        } else {
            self.emit_hash_switch(&keys, callback, default_label, pop_default_label, break_label)?;
        }

        self.mark_label(pop_default_label)?;
        self.pop();
        self.mark_label(default_label)?;
        callback.emit_default(self, break_label)?;
        self.mark_label(break_label)?;
        Ok(())
    }

    fn emit_hash_switch<C>(
        &mut self,
        keys: &[&str],
        callback: &mut C,
        default_label: Label,
        pop_default_label: Label,
        break_label: Label,
    ) -> Result<(), Error>
    where
        C: for<'k> SwitchCallback<&'k str>,
    {
        let mut buckets: BTreeMap<i32, Vec<&str>> = BTreeMap::new();
        for key in keys {
            buckets.entry(java_string_hash(key)).or_default().push(*key);
        }
        let hashes: Vec<i32> = buckets.keys().copied().collect();
        let labels: Vec<Label> = hashes.iter().map(|_| self.define_label()).collect();

        self.dup();
        self.call(&MethodRef::object_hash_code())?;
        self.emit_switch_instruction(&hashes, &labels, pop_default_label, SwitchOptions::Default)?;

        let string_equals = MethodRef::virtual_method(
            Type::string(),
            UnqualifiedName::EQUALS,
            vec![Type::object()],
            Type::BOOLEAN,
        );
        for (bucket, label) in buckets.values().zip(&labels) {
            self.mark_label(*label)?;
            let (last, rest) = match bucket.split_last() {
                Some(split) => split,
                None => continue,
            };
            for key in rest {
                let next = self.define_label();
                self.dup();
                self.emit_string(key)?;
                self.call(&string_equals)?;
                self.emit_branch(OpCode::IFEQ, next)?;
                self.pop();
                callback.emit_case(self, key, break_label)?;
                self.mark_label(next)?;
            }
            self.emit_string(last)?;
            self.call(&string_equals)?;
            self.emit_branch(OpCode::IFEQ, default_label)?;
            callback.emit_case(self, last, break_label)?;
        }
        Ok(())
    }

    fn emit_trie_switch<C>(
        &mut self,
        keys: &[&str],
        callback: &mut C,
        pop_default_label: Label,
        break_label: Label,
    ) -> Result<(), Error>
    where
        C: for<'k> SwitchCallback<&'k str>,
    {
        let mut by_length: BTreeMap<i32, Vec<(&str, Vec<u16>)>> = BTreeMap::new();
        for key in keys {
            let units: Vec<u16> = key.encode_utf16().collect();
            by_length
                .entry(units.len() as i32)
                .or_default()
                .push((*key, units));
        }
        let lengths: Vec<i32> = by_length.keys().copied().collect();
        let labels: Vec<Label> = lengths.iter().map(|_| self.define_label()).collect();

        self.dup();
        self.call(&MethodRef::string_length())?;
        self.emit_switch_instruction(&lengths, &labels, pop_default_label, SwitchOptions::Default)?;

        for (bucket, label) in by_length.values().zip(&labels) {
            self.mark_label(*label)?;
            self.emit_trie_level(bucket, 0, callback, pop_default_label, break_label)?;
        }
        Ok(())
    }

    /// Dispatch on the character at `depth` among keys sharing the same length and prefix
    fn emit_trie_level<C>(
        &mut self,
        keys: &[(&str, Vec<u16>)],
        depth: usize,
        callback: &mut C,
        pop_default_label: Label,
        break_label: Label,
    ) -> Result<(), Error>
    where
        C: for<'k> SwitchCallback<&'k str>,
    {
        match keys {
            [(key, units)] if units.len() == depth => {
                self.pop();
                return callback.emit_case(self, key, break_label);
            }
            _ => (),
        }

        let mut by_char: BTreeMap<u16, Vec<(&str, Vec<u16>)>> = BTreeMap::new();
        for (key, units) in keys {
            if let Some(unit) = units.get(depth) {
                by_char
                    .entry(*unit)
                    .or_default()
                    .push((*key, units.clone()));
            }
        }
        let chars: Vec<i32> = by_char.keys().map(|unit| *unit as i32).collect();
        let labels: Vec<Label> = chars.iter().map(|_| self.define_label()).collect();

        self.dup();
        self.emit_integer(depth as i32)?;
        self.call(&MethodRef::string_char_at())?;
        self.emit_switch_instruction(&chars, &labels, pop_default_label, SwitchOptions::Default)?;

        for (group, label) in by_char.values().zip(&labels) {
            self.mark_label(*label)?;
            self.emit_trie_level(group, depth + 1, callback, pop_default_label, break_label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::ConstantsPool;
    use crate::jvm::code::MethodCode;

    /// Each case returns its position in the key list, default returns `-1`
    struct ReturnIndex<K> {
        keys: Vec<K>,
        seen: Vec<K>,
    }

    impl<K: PartialEq + Copy> ReturnIndex<K> {
        fn new(keys: &[K]) -> ReturnIndex<K> {
            ReturnIndex {
                keys: keys.to_vec(),
                seen: vec![],
            }
        }

        fn case(&mut self, code: &mut CodeGenerator<'_>, key: K) -> Result<(), Error> {
            self.seen.push(key);
            let index = self.keys.iter().position(|k| *k == key).unwrap_or(0);
            code.emit_integer(index as i32)?;
            code.emit_return(&Type::INT);
            Ok(())
        }
    }

    impl SwitchCallback<i32> for ReturnIndex<i32> {
        fn emit_case(
            &mut self,
            code: &mut CodeGenerator<'_>,
            key: i32,
            _break_target: Label,
        ) -> Result<(), Error> {
            self.case(code, key)
        }

        fn emit_default(
            &mut self,
            code: &mut CodeGenerator<'_>,
            _break_target: Label,
        ) -> Result<(), Error> {
            code.emit_integer(-1)?;
            code.emit_return(&Type::INT);
            Ok(())
        }
    }

    struct StringCases {
        seen: Vec<String>,
    }

    impl<'k> SwitchCallback<&'k str> for StringCases {
        fn emit_case(
            &mut self,
            code: &mut CodeGenerator<'_>,
            key: &'k str,
            break_target: Label,
        ) -> Result<(), Error> {
            self.seen.push(key.to_owned());
            code.emit_goto(break_target)
        }
    }

    #[test]
    fn strategy_selection() {
        let dense = [0, 1, 2, 3, 4];
        let sparse = [0, 1000];
        assert_eq!(select_switch_opcode(&dense, SwitchOptions::Default), OpCode::TABLESWITCH);
        assert_eq!(select_switch_opcode(&sparse, SwitchOptions::Default), OpCode::LOOKUPSWITCH);
        assert_eq!(select_switch_opcode(&sparse, SwitchOptions::PreferTable), OpCode::TABLESWITCH);
        assert_eq!(select_switch_opcode(&dense, SwitchOptions::PreferLookup), OpCode::LOOKUPSWITCH);
        assert_eq!(select_switch_opcode(&[], SwitchOptions::Default), OpCode::LOOKUPSWITCH);
        assert_eq!(
            select_switch_opcode(&[i32::MIN, i32::MAX], SwitchOptions::PreferTable),
            OpCode::LOOKUPSWITCH
        );
    }

    #[test]
    fn string_hashes() {
        assert_eq!(java_string_hash(""), 0);
        assert_eq!(java_string_hash("a"), 97);
        assert_eq!(java_string_hash("hello"), 99162322);
        assert_eq!(java_string_hash("Aa"), java_string_hash("BB"));
    }

    #[test]
    fn table_switch_layout() {
        let mut pool = ConstantsPool::new();
        let mut code = MethodCode::new(None, vec![Type::INT]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        let mut callback = ReturnIndex::new(&[1, 2, 4]);
        gen.emit_load_argument(0).unwrap();
        gen.emit_switch(&[4, 2, 1], &mut callback, SwitchOptions::Default)
            .unwrap();
        assert_eq!(callback.seen, vec![1, 2, 4]);

        let baked = code.bake().unwrap().unwrap();
        let bytes = &baked.bytes;
        // iload_0, tableswitch, 2 bytes padding
        assert_eq!(&bytes[..4], &[0x1A, 0xAA, 0, 0]);
        let word = |at: usize| i32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let (low, high) = (word(8), word(12));
        assert_eq!((low, high), (1, 4));
        let default = word(4);
        let targets: Vec<i32> = (0..4).map(|i| word(16 + 4 * i)).collect();
        // keys 1, 2, 4 and a gap for 3
        assert_eq!(targets[2], default);
        assert_ne!(targets[0], default);
        // first case starts right after the table
        assert_eq!(targets[0], 32 - 1);
        assert_eq!(&bytes[32..34], &[0x03, 0xAC]);
    }

    #[test]
    fn lookup_switch_layout() {
        let mut pool = ConstantsPool::new();
        let mut code = MethodCode::new(None, vec![Type::INT]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        let mut callback = ReturnIndex::new(&[0, 1000]);
        gen.emit_load_argument(0).unwrap();
        gen.emit_switch(&[1000, 0], &mut callback, SwitchOptions::Default)
            .unwrap();

        let baked = code.bake().unwrap().unwrap();
        let bytes = &baked.bytes;
        assert_eq!(bytes[1], 0xAB);
        let word = |at: usize| i32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        assert_eq!(word(8), 2);
        assert_eq!((word(12), word(20)), (0, 1000));
        assert_eq!(word(16), 28 - 1);
    }

    #[test]
    fn hash_switch_visits_every_key() {
        let mut pool = ConstantsPool::new();
        let mut code = MethodCode::new(None, vec![Type::string()]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        let mut callback = StringCases { seen: vec![] };
        gen.emit_load_argument(0).unwrap();
        gen.emit_string_switch(&["Aa", "BB", "c", "Aa"], &mut callback, SwitchOptions::Default)
            .unwrap();
        gen.emit_return(&Type::VOID);

        let mut seen = callback.seen.clone();
        seen.sort();
        assert_eq!(seen, vec!["Aa", "BB", "c"]);
        let baked = code.bake().unwrap().unwrap();
        // aload_0, dup, invokevirtual hashCode, lookupswitch
        assert_eq!(&baked.bytes[..3], &[0x2A, 0x59, 0xB6]);
        assert_eq!(baked.bytes[5], 0xAB);
    }

    #[test]
    fn trie_switch_visits_every_key() {
        let mut pool = ConstantsPool::new();
        let mut code = MethodCode::new(None, vec![Type::string()]);
        let mut gen = CodeGenerator::new(&mut pool, &mut code);
        let mut callback = StringCases { seen: vec![] };
        gen.emit_load_argument(0).unwrap();
        gen.emit_string_switch(&["", "ab", "ac", "b"], &mut callback, SwitchOptions::PreferTrie)
            .unwrap();
        gen.emit_return(&Type::VOID);

        assert_eq!(callback.seen, vec!["", "b", "ab", "ac"]);
        let baked = code.bake().unwrap().unwrap();
        // aload_0, dup, invokevirtual length, tableswitch
        assert_eq!(&baked.bytes[..3], &[0x2A, 0x59, 0xB6]);
        assert_eq!(baked.bytes[5], 0xAA);
    }
}
