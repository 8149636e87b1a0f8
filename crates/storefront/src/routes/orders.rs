//! Order route handlers.
//!
//! Placement converts the request body into a validated [`PlaceOrder`] and
//! hands it to the order workflow. With `clear_cart` set, the caller's cart
//! is emptied once the order exists; a failure there is logged and the
//! order still stands.

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{instrument, warn};

use bazaar_core::{
    AccountId, CartOwner, OrderId, OrderStatus, PaymentMethod, Phone, Pincode, ProductId,
};

use super::{ApiJson, ApiPath, cart::positive_quantity};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAccount, RequireAdmin};
use crate::models::{Order, OrderUpdate, ShippingAddress};
use crate::services::{LineRequest, PlaceOrder};
use crate::state::AppState;

/// One line of a placement request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    #[serde(alias = "product")]
    pub product_id: ProductId,
    pub quantity: i64,
    /// Unit price the client displayed.
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// Order placement request body.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
    pub payment_method: String,
    /// Shipping fee the client computed; the server recomputes it.
    #[serde(default)]
    pub shipping: Option<Decimal>,
    /// Account the client believes it is; must match the caller if sent.
    #[serde(default)]
    pub user: Option<AccountId>,
    #[serde(default)]
    pub is_paid: Option<bool>,
    #[serde(default)]
    pub clear_cart: bool,
}

/// Administrative update body.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_paid: Option<bool>,
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_owned())
}

fn shipping_address(body: &PlaceOrderRequest) -> Result<ShippingAddress> {
    Ok(ShippingAddress {
        full_name: required("full_name", &body.full_name)?,
        phone: Phone::parse(&body.phone).map_err(|e| AppError::BadRequest(e.to_string()))?,
        address: required("address", &body.address)?,
        city: required("city", &body.city)?,
        state: required("state", &body.state)?,
        pincode: Pincode::parse(&body.pincode).map_err(|e| AppError::BadRequest(e.to_string()))?,
    })
}

fn place_order_request(account: AccountId, body: &PlaceOrderRequest) -> Result<PlaceOrder> {
    if body.user.is_some_and(|user| user != account) {
        return Err(AppError::Forbidden(
            "Cannot place an order for another account".to_string(),
        ));
    }

    let lines = body
        .items
        .iter()
        .map(|item| {
            Ok(LineRequest {
                product_id: item.product_id,
                quantity: positive_quantity(item.quantity)?,
                price: item.price,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let payment_method = body
        .payment_method
        .parse::<PaymentMethod>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(PlaceOrder {
        account,
        lines,
        shipping_address: shipping_address(body)?,
        payment_method,
        is_paid: body.is_paid,
        client_shipping: body.shipping,
    })
}

/// Place an order for the caller.
#[instrument(skip(state, body), fields(items = body.items.len()))]
pub async fn create(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
    ApiJson(body): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let request = place_order_request(account, &body)?;
    let order = state.orders().place_order(request).await?;

    if body.clear_cart
        && let Err(e) = state.carts().clear(&CartOwner::Account(account)).await
    {
        warn!(code = %order.code, error = %e, "Order placed but cart could not be cleared");
    }

    Ok((StatusCode::CREATED, Json(order)))
}

/// The caller's orders, newest first.
#[instrument(skip(state))]
pub async fn mine(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list_for_account(account).await?))
}

/// One of the caller's orders.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    RequireAccount(account): RequireAccount,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().get_for_account(account, id).await?))
}

/// Update an order's status and/or paid flag (admin).
#[instrument(skip(state, _admin))]
pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<UpdateOrderRequest>,
) -> Result<Json<Order>> {
    let status = body
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let update = OrderUpdate {
        status,
        is_paid: body.is_paid,
    };
    Ok(Json(state.orders().update(id, update).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::http::Method;
    use serde_json::{Value, json};

    use super::super::testing::{ADMIN_TOKEN, TestApp};
    use super::*;

    fn order_body(items: &Value, state: &str) -> Value {
        json!({
            "items": items,
            "full_name": "Meena Raman",
            "phone": "+91 98400 12345",
            "address": "12 Temple Street",
            "city": "Madurai",
            "state": state,
            "pincode": "625001",
            "payment_method": "cod",
        })
    }

    #[tokio::test]
    async fn test_place_order_end_to_end() {
        let mut app = TestApp::new();
        let saree = app.product("Silk Saree", 400, 5).await;
        app.as_account(1);

        let body = order_body(
            &json!([{ "productId": saree.id, "quantity": 2, "price": 400 }]),
            "Tamil Nadu",
        );
        let (status, order) = app.call(Method::POST, "/orders", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["code"], "ORD1");
        assert_eq!(order["subtotal"], "800");
        assert_eq!(order["shipping_fee"], "0");
        assert_eq!(order["total"], "800");
        assert_eq!(order["status"], "Pending");
        assert_eq!(order["payment_method"], "COD");
        assert_eq!(order["is_paid"], false);
        assert_eq!(order["shipping_address"]["phone"], "9840012345");
        assert_eq!(app.store.stock(saree.id).await, Some(3));
    }

    #[tokio::test]
    async fn test_out_of_stock_conflict() {
        let mut app = TestApp::new();
        let lamp = app.product("Brass Lamp", 100, 3).await;
        app.as_account(1);

        let body = order_body(&json!([{ "productId": lamp.id, "quantity": 10 }]), "Goa");
        let (status, error) = app.call(Method::POST, "/orders", Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error["error"], "Insufficient stock for Brass Lamp");
        assert_eq!(app.store.stock(lamp.id).await, Some(3));
    }

    #[tokio::test]
    async fn test_placement_validation() {
        let mut app = TestApp::new();
        let saree = app.product("Silk Saree", 400, 5).await;
        app.as_account(1);
        let items = json!([{ "productId": saree.id, "quantity": 1 }]);

        let mut bad_phone = order_body(&items, "Kerala");
        bad_phone["phone"] = json!("12345");
        let mut bad_pincode = order_body(&items, "Kerala");
        bad_pincode["pincode"] = json!("012345");
        let mut blank_name = order_body(&items, "Kerala");
        blank_name["full_name"] = json!("   ");
        let mut bad_payment = order_body(&items, "Kerala");
        bad_payment["payment_method"] = json!("barter");
        let empty = order_body(&json!([]), "Kerala");
        let negative = order_body(&json!([{ "productId": saree.id, "quantity": -1 }]), "Kerala");

        for body in [bad_phone, bad_pincode, blank_name, bad_payment, empty, negative] {
            let (status, error) = app.call(Method::POST, "/orders", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{error}");
        }
        assert_eq!(app.store.stock(saree.id).await, Some(5));
    }

    #[tokio::test]
    async fn test_placement_requires_account() {
        let mut app = TestApp::new();
        let saree = app.product("Silk Saree", 400, 5).await;
        let body = order_body(&json!([{ "productId": saree.id, "quantity": 1 }]), "Goa");

        let (status, _) = app.call(Method::POST, "/orders", Some(body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        app.as_account(1);
        let mut other_user = body;
        other_user["user"] = json!(2);
        let (status, _) = app.call(Method::POST, "/orders", Some(other_user)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_clear_cart_after_placement() {
        let mut app = TestApp::new();
        let saree = app.product("Silk Saree", 400, 5).await;
        app.as_account(4);
        app.call(Method::POST, "/cart", Some(json!({ "productId": saree.id, "quantity": 2 })))
            .await;

        let mut body = order_body(&json!([{ "productId": saree.id, "quantity": 2 }]), "Goa");
        body["clear_cart"] = json!(true);
        let (status, order) = app.call(Method::POST, "/orders", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["shipping_fee"], "200");

        let (_, cart) = app.call(Method::GET, "/cart", None).await;
        assert!(cart["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_queries_are_scoped() {
        let mut app = TestApp::new();
        let saree = app.product("Silk Saree", 400, 10).await;
        app.as_account(1);
        for _ in 0..2 {
            let body = order_body(&json!([{ "productId": saree.id, "quantity": 1 }]), "Goa");
            app.call(Method::POST, "/orders", Some(body)).await;
        }

        let (status, orders) = app.call(Method::GET, "/orders/user", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(orders[0]["code"], "ORD2");
        assert_eq!(orders[1]["code"], "ORD1");
        let id = orders[1]["id"].as_i64().unwrap();

        let (status, order) = app.call(Method::GET, &format!("/orders/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["code"], "ORD1");

        app.as_account(2);
        let (status, _) = app.call(Method::GET, &format!("/orders/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, orders) = app.call(Method::GET, "/orders/user", None).await;
        assert!(orders.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_status_updates() {
        let mut app = TestApp::new();
        let saree = app.product("Silk Saree", 400, 5).await;
        app.as_account(1);
        let body = order_body(&json!([{ "productId": saree.id, "quantity": 1 }]), "Goa");
        let (_, order) = app.call(Method::POST, "/orders", Some(body)).await;
        let uri = format!("/orders/{}", order["id"]);

        // A header-identified customer has no admin role.
        let (status, _) = app
            .call(Method::PUT, &uri, Some(json!({ "status": "shipped" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        app.with_admin_token("not-the-token");
        let (status, _) = app
            .call(Method::PUT, &uri, Some(json!({ "status": "shipped" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        app.with_admin_token(ADMIN_TOKEN);
        let (status, order) = app
            .call(Method::PUT, &uri, Some(json!({ "status": "SHIPPED", "is_paid": true })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["status"], "Shipped");
        assert_eq!(order["is_paid"], true);

        let (status, _) = app
            .call(Method::PUT, &uri, Some(json!({ "status": "pending" })))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .call(Method::PUT, &uri, Some(json!({ "status": "lost" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .call(Method::PUT, "/orders/9999", Some(json!({ "status": "delivered" })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_session_admin_and_customer() {
        let mut app = TestApp::new();
        let saree = app.product("Silk Saree", 400, 5).await;
        app.as_account(1);
        let body = order_body(&json!([{ "productId": saree.id, "quantity": 1 }]), "Goa");
        let (_, order) = app.call(Method::POST, "/orders", Some(body)).await;
        let uri = format!("/orders/{}", order["id"]);
        app.as_guest();

        let (status, _) = app
            .call(Method::PUT, &uri, Some(json!({ "status": "processing" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        app.sign_in(5, false).await;
        let (status, _) = app
            .call(Method::PUT, &uri, Some(json!({ "status": "processing" })))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        app.sign_in(6, true).await;
        let (status, order) = app
            .call(Method::PUT, &uri, Some(json!({ "status": "processing" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["status"], "Processing");
    }

    #[tokio::test]
    async fn test_placement_is_rate_limited() {
        let mut app = TestApp::new();
        app.as_account(1);

        let empty = order_body(&json!([]), "Goa");
        for _ in 0..10 {
            let (status, _) = app.call(Method::POST, "/orders", Some(empty.clone())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        let (status, _) = app.call(Method::POST, "/orders", Some(empty)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }
}
