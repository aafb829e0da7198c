// Copyright 2019 The whatwg-url developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Data-driven tests

use serde_json::Value;
use whatwg_url::Url;

#[test]
fn urltestdata() {
    let cases: Value = serde_json::from_str(include_str!("urltestdata.json")).unwrap();
    for case in cases.as_array().unwrap() {
        let input = case["input"].as_str().unwrap();
        let base = case.get("base").and_then(Value::as_str);

        let result = match base {
            Some(base_str) => {
                let base = Url::parse(base_str).unwrap_or_else(|err| {
                    panic!("error parsing base {:?}: {}", base_str, err)
                });
                base.join(input)
            }
            None => Url::parse(input),
        };

        if case.get("failure").and_then(Value::as_bool) == Some(true) {
            assert!(
                result.is_err(),
                "expected a parse error for {:?} against {:?}",
                input,
                base
            );
            continue;
        }
        let url = result
            .unwrap_or_else(|err| panic!("error parsing {:?} against {:?}: {}", input, base, err));

        let expected = |key: &str| case.get(key).and_then(Value::as_str);
        macro_rules! assert_component {
            ($getter: ident) => {
                if let Some(value) = expected(stringify!($getter)) {
                    assert_eq!(
                        url.$getter(),
                        value,
                        "{} of {:?} against {:?}",
                        stringify!($getter),
                        input,
                        base
                    );
                }
            };
        }

        assert_component!(href);
        assert_component!(protocol);
        assert_component!(username);
        assert_component!(password);
        assert_component!(host);
        assert_component!(hostname);
        assert_component!(port);
        assert_component!(pathname);
        assert_component!(search);
        assert_component!(hash);
        assert_component!(origin);
    }
}
