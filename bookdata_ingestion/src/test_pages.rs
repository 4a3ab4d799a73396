//! Canned catalog pages shaped like the books.toscrape.com markup

pub struct BookPage {
    pub upc: &'static str,
    pub name: &'static str,
    pub price: &'static str,
    pub availability: &'static str,
    pub rating_class: &'static str,
    pub reviews: Option<&'static str>,
    pub category: &'static str,
    pub description: Option<&'static str>,
    pub image: bool,
}

impl Default for BookPage {
    fn default() -> Self {
        Self {
            upc: "a897fe39b1053632",
            name: "A Light in the Attic",
            price: "£51.77",
            availability: "In stock (22 available)",
            rating_class: "Three",
            reviews: Some("0"),
            category: "Poetry",
            description: Some("It's hard to imagine a world"),
            image: true,
        }
    }
}

pub fn book_page(page: &BookPage) -> String {
    let image = if page.image {
        format!(
            r#"<div class="item active"><img src="../../media/cache/fe/72/fe72.jpg" alt="{}" /></div>"#,
            page.name
        )
    } else {
        String::new()
    };
    let description = page
        .description
        .map(|description| {
            format!(
                r#"<div id="product_description" class="sub-header"><h2>Product Description</h2></div>
<p>{}</p>"#,
                description
            )
        })
        .unwrap_or_default();
    let reviews = page
        .reviews
        .map(|reviews| format!("<tr><th>Number of reviews</th><td>{}</td></tr>", reviews))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html><head><title>{name}</title></head><body>
<ul class="breadcrumb">
  <li><a href="../../index.html">Home</a></li>
  <li><a href="../category/books_1/index.html">Books</a></li>
  <li><a href="../category/books/poetry_23/index.html">{category}</a></li>
  <li class="active">{name}</li>
</ul>
<div id="product_gallery" class="carousel"><div class="carousel-inner">{image}</div></div>
<div class="col-sm-6 product_main">
  <h1>{name}</h1>
  <p class="price_color">{price}</p>
  <p class="star-rating {rating_class}"><i class="icon-star"></i></p>
</div>
{description}
<table class="table table-striped">
  <tr><th>UPC</th><td>{upc}</td></tr>
  <tr><th>Product Type</th><td>Books</td></tr>
  <tr><th>Availability</th><td>{availability}</td></tr>
  {reviews}
</table>
</body></html>"#,
        name = page.name,
        category = page.category,
        image = image,
        price = page.price,
        rating_class = page.rating_class,
        description = description,
        upc = page.upc,
        availability = page.availability,
        reviews = reviews,
    )
}

pub fn listing_page(links: &[&str], has_next: bool, pager: Option<(i32, i32)>) -> String {
    let items: String = links
        .iter()
        .map(|link| {
            format!(
                r#"<li><article class="product_pod"><h3><a href="{0}" title="{0}">{0}</a></h3></article></li>"#,
                link
            )
        })
        .collect();
    let current = pager
        .map(|(page, total)| {
            format!("<li class=\"current\">\n    Page {} of {}\n</li>", page, total)
        })
        .unwrap_or_default();
    let next = if has_next {
        r#"<li class="next"><a href="page-2.html">next</a></li>"#
    } else {
        ""
    };
    format!(
        r#"<!DOCTYPE html>
<html><body>
<ol class="row">{}</ol>
<ul class="pager">{}{}</ul>
</body></html>"#,
        items, current, next
    )
}
