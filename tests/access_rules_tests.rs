use storefront_portal::{
    access::{Access, RouteClass, classify, decide, is_login_page, is_protected, is_static_asset},
    models::Role,
};

fn other() -> Role {
    Role::Other("cliente".to_string())
}

// --- Static assets ---

#[test]
fn test_static_asset_detection() {
    for path in [
        "/favicon.ico",
        "/admin/logo.PNG",
        "/_astro/index.9a8b7c.js",
        "/fonts/inter.woff2",
        "/vendedores/site.webmanifest",
        "/robots.txt",
    ] {
        assert!(is_static_asset(path), "{path} should be static");
    }

    for path in ["/", "/admin", "/admin/dashboard", "/api/productos", "/.env", "/admin/v1.2/pedidos", "/productos/cafe.premium"] {
        assert!(!is_static_asset(path), "{path} should not be static");
    }
}

// --- Classification ---

#[test]
fn test_login_pages_are_not_protected() {
    assert!(is_login_page("/admin/login"));
    assert!(is_login_page("/vendedores/login"));
    assert!(!is_protected("/admin/login"));
    assert!(!is_protected("/vendedores/login"));
}

#[test]
fn test_protected_prefixes() {
    assert!(is_protected("/admin"));
    assert!(is_protected("/admin/pedidos/15"));
    assert!(is_protected("/vendedores"));
    assert!(is_protected("/vendedores/clientes"));
    // Plain prefix match, no segment boundary.
    assert!(is_protected("/administrator"));

    assert!(!is_protected("/"));
    assert!(!is_protected("/productos"));
    assert!(!is_protected("/api/admin"));
}

#[test]
fn test_classify() {
    assert_eq!(classify("/admin/login"), RouteClass::LoginPage);
    assert_eq!(classify("/vendedores/login?next=/vendedores"), RouteClass::LoginPage);
    assert_eq!(classify("/admin/dashboard"), RouteClass::Admin);
    assert_eq!(classify("/vendedores"), RouteClass::Vendedor);
    assert_eq!(classify("/catalogo"), RouteClass::Other);
}

// --- Access matrix ---

#[test]
fn test_matrix_for_admin() {
    assert_eq!(decide(&Role::Admin, "/admin/login"), Access::Redirect("/admin/dashboard"));
    assert_eq!(decide(&Role::Admin, "/vendedores/login"), Access::Redirect("/admin/dashboard"));
    assert_eq!(decide(&Role::Admin, "/admin/pedidos"), Access::Forward);
    assert_eq!(decide(&Role::Admin, "/vendedores/clientes"), Access::Forward);
    assert_eq!(decide(&Role::Admin, "/"), Access::Forward);
}

#[test]
fn test_matrix_for_vendor() {
    assert_eq!(decide(&Role::Vendedor, "/admin/login"), Access::Redirect("/vendedores"));
    assert_eq!(decide(&Role::Vendedor, "/admin/dashboard"), Access::Redirect("/vendedores"));
    assert_eq!(decide(&Role::Vendedor, "/vendedores/clientes"), Access::Forward);
    assert_eq!(decide(&Role::Vendedor, "/productos"), Access::Forward);
}

#[test]
fn test_matrix_for_other_roles() {
    let role = other();
    assert_eq!(decide(&role, "/vendedores/login"), Access::Redirect("/"));
    assert_eq!(decide(&role, "/admin"), Access::Redirect("/"));
    assert_eq!(decide(&role, "/vendedores"), Access::Redirect("/"));
    assert_eq!(decide(&role, "/productos"), Access::Forward);

    // An empty role string is just another unknown role.
    assert_eq!(decide(&Role::from(""), "/admin"), Access::Redirect("/"));
}
