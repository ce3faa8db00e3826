#![no_main]

use glirc_lua_core::Event;
use glirc_lua_core::marshal::{CallRequest, message_from_lua};
use libfuzzer_sys::fuzz_target;
use mlua::Lua;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(event) = toml::from_str::<Event>(source) else {
        return;
    };

    let lua = Lua::new();
    let request = CallRequest::build(&lua, &event).expect("any parsed event marshals");
    assert_eq!(request.name(), event.name());
    match (&event, request.argument()) {
        (Event::Message(message), Some(table)) => {
            assert_eq!(&message_from_lua(table).expect("message reads back"), message);
        }
        (Event::Stop, argument) => assert!(argument.is_none()),
        (_, argument) => assert!(argument.is_some()),
    }
});
