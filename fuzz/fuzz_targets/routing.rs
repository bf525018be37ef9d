//! Fuzz target for route registration and matching.
//!
//! Arbitrary templates may be rejected at registration, and arbitrary
//! request paths may fail to match, but neither may panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use waymark_core::{handler, Dispatcher, Error, HttpRequest, HttpResponse, RouteCollection};

#[derive(Debug, Arbitrary)]
struct FuzzRouting {
    prefix: String,
    routes: Vec<FuzzRoute>,
    match_paths: Vec<(FuzzMethod, String)>,
}

#[derive(Debug, Arbitrary)]
struct FuzzRoute {
    method: FuzzMethod,
    template: String,
    grouped: bool,
}

#[derive(Debug, Arbitrary, Clone, Copy)]
enum FuzzMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl FuzzMethod {
    fn as_str(self) -> &'static str {
        match self {
            FuzzMethod::Get => "GET",
            FuzzMethod::Post => "POST",
            FuzzMethod::Put => "PUT",
            FuzzMethod::Delete => "DELETE",
            FuzzMethod::Patch => "PATCH",
        }
    }
}

fuzz_target!(|data: FuzzRouting| {
    let ok = handler(|_req: HttpRequest| async { Ok::<_, Error>(HttpResponse::ok()) });
    let mut routes = RouteCollection::new();
    let mut grouped = Vec::new();

    for route in data.routes.into_iter().take(100) {
        if route.template.len() > 1000 {
            continue;
        }
        if route.grouped {
            grouped.push(route);
        } else {
            let _ = routes.route(route.method.as_str(), &route.template, ok.clone());
        }
    }

    let group_handler = ok.clone();
    routes.route_group(&data.prefix, move |group| {
        for route in grouped {
            let _ = group.route(route.method.as_str(), &route.template, group_handler.clone());
        }
        Ok(())
    });

    let Ok(dispatcher) = Dispatcher::new(routes) else {
        return;
    };

    for (method, path) in &data.match_paths {
        if path.len() > 10000 {
            continue;
        }
        let _ = dispatcher.match_route(path, method.as_str());
    }
});
