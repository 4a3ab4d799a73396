use paperclip::actix::web;

use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(handlers::root)))
        .service(
            web::scope("/api/v1")
                .service(web::resource("/health").route(web::get().to(handlers::health)))
                .service(web::resource("/books").route(web::get().to(handlers::list_books)))
                // Named book routes go before /books/{book_id} so they are not taken for an id
                .service(
                    web::resource("/books/search").route(web::get().to(handlers::search_books)),
                )
                .service(
                    web::resource("/books/top-rated")
                        .route(web::get().to(handlers::top_rated_books)),
                )
                .service(
                    web::resource("/books/price-range")
                        .route(web::get().to(handlers::books_by_price_range)),
                )
                .service(
                    web::resource("/books/{book_id}").route(web::get().to(handlers::get_book)),
                )
                .service(web::resource("/categories").route(web::get().to(handlers::categories)))
                .service(
                    web::scope("/stats")
                        .service(
                            web::resource("/overview")
                                .route(web::get().to(handlers::stats_overview)),
                        )
                        .service(
                            web::resource("/categories")
                                .route(web::get().to(handlers::stats_categories)),
                        ),
                )
                .service(
                    web::scope("/auth")
                        .service(
                            web::resource("/users")
                                .route(web::post().to(handlers::register_user)),
                        )
                        .service(web::resource("/login").route(web::post().to(handlers::login)))
                        .service(
                            web::resource("/users/me")
                                .route(web::get().to(handlers::current_user)),
                        ),
                ),
        );
}
