//! Declarative portal route table.

pub const LOGIN_PATH: &str = "/employee/login";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub name: &'static str,
    pub requires_auth: bool,
}

impl Route {
    const fn public(path: &'static str, name: &'static str) -> Self {
        Self {
            path,
            name,
            requires_auth: false,
        }
    }

    const fn protected(path: &'static str, name: &'static str) -> Self {
        Self {
            path,
            name,
            requires_auth: true,
        }
    }
}

const PORTAL_ROUTES: [Route; 7] = [
    Route::public("/", "Home"),
    Route::public("/services", "Services"),
    Route::public("/chatbot", "Chatbot"),
    Route::public(LOGIN_PATH, "Employee Login"),
    Route::protected("/employee/dashboard", "Employee Dashboard"),
    Route::public("/employee/tickets/create", "Create Ticket"),
    Route::public("/employee/tickets", "View Tickets"),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    #[must_use]
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The employee portal's views, in declaration order.
    #[must_use]
    pub fn portal() -> Self {
        Self::new(PORTAL_ROUTES.to_vec())
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Find the route for a location. Query strings, fragments and a trailing
    /// slash are ignored.
    #[must_use]
    pub fn resolve(&self, location: &str) -> Option<&Route> {
        let path = normalize(location);
        self.routes.iter().find(|route| route.path == path)
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.name == name)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::portal()
    }
}

fn normalize(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    let path = location[..end].trim_end_matches('/');
    if path.is_empty() { "/" } else { path }
}
