#![no_main]

use std::collections::BTreeMap;

use glirc_lua_core::marshal::{message_from_lua, message_to_lua};
use glirc_lua_core::{Message, Prefix};
use libfuzzer_sys::fuzz_target;
use mlua::Lua;

/// Splits fuzz input into length-prefixed fields.
struct Fields<'a> {
    data: &'a [u8],
}

impl Fields<'_> {
    fn byte(&mut self) -> u8 {
        let (&first, rest) = self.data.split_first().unwrap_or((&0, &[]));
        self.data = rest;
        first
    }

    fn text(&mut self) -> String {
        let len = usize::from(self.byte() % 32).min(self.data.len());
        let (head, rest) = self.data.split_at(len);
        self.data = rest;
        String::from_utf8_lossy(head).into_owned()
    }

    fn optional(&mut self) -> Option<String> {
        if self.byte() % 2 == 0 {
            None
        } else {
            Some(self.text())
        }
    }
}

fn message_from_bytes(data: &[u8]) -> Message {
    let mut fields = Fields { data };
    let mut tags = BTreeMap::new();
    for _ in 0..fields.byte() % 4 {
        tags.insert(fields.text(), fields.text());
    }
    let network = fields.text();
    let prefix = Prefix {
        nick: fields.optional(),
        user: fields.optional(),
        host: fields.optional(),
    };
    let command = fields.text();
    let params = (0..fields.byte() % 16).map(|_| fields.text()).collect();
    Message {
        tags,
        network,
        prefix,
        command,
        params,
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }

    let message = message_from_bytes(data);
    let lua = Lua::new();
    let table = message_to_lua(&lua, &message).expect("marshal into a fresh interpreter");
    let back = message_from_lua(&table).expect("marshaled message reads back");
    assert_eq!(back, message);
});
