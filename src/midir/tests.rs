// SPDX-FileCopyrightText: The midihub authors
// SPDX-License-Identifier: MPL-2.0

use super::*;

fn port_name(port: &u32) -> Result<String, PortInfoError> {
    match port {
        1 => Err(PortInfoError::CannotRetrievePortName),
        _ => Ok(format!("Port {port}")),
    }
}

#[test]
fn skip_ports_with_unreadable_names() {
    let found = filter_ports_by_name(Direction::Input, [0, 1, 2], port_name, |_| true)
        .collect::<Vec<_>>();
    assert_eq!(
        vec![("Port 0".to_owned(), 0), ("Port 2".to_owned(), 2)],
        found
    );
}

#[test]
fn filter_ports_by_name_predicate() {
    let found = filter_ports_by_name(Direction::Output, [0, 1, 2, 3], port_name, |name| {
        name.ends_with('3')
    })
    .collect::<Vec<_>>();
    assert_eq!(vec![("Port 3".to_owned(), 3)], found);
}
